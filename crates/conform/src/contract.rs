use serde::Serialize;

/// How an operation receives its subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Receiver {
    /// `&self`
    Shared,
    /// `&mut self`
    Exclusive,
    /// `self`
    Value,
}

/// One operation requirement of a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Requirement {
    pub name: &'static str,
    pub receiver: Receiver,
}

/// Implemented by the marker type `#[contract]` generates.
///
/// `REQUIREMENTS` lists operation requirements in declaration order, which is
/// also the order binding fields are checked in. Data requirements are
/// associated constants on the marker and are not listed.
pub trait Contract {
    const NAME: &'static str;
    const REQUIREMENTS: &'static [Requirement];

    fn requirement(name: &str) -> Option<&'static Requirement> {
        Self::REQUIREMENTS.iter().find(|req| req.name == name)
    }
}
