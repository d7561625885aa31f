#![forbid(unsafe_code)]

use conform::{subject, Contract, DefinitionError, Outcome, Receiver, Requirement};

mod contracts {
    use conform::contract;

    #[contract]
    pub trait Iterator {
        const ITEM_NAME: &'static str = "u32";

        /// Advance and return the next value.
        fn next(&mut self) -> Option<u32>;
        fn remaining(&self) -> usize;
    }

    #[contract(bindings_only)]
    pub trait Merge {
        fn merge(&mut self, other: Self);
        fn peek(&self) -> &u32;
    }

    #[contract(bindings_only)]
    pub trait Dictionary {
        fn lookup(&self, key: &str) -> &str;
    }
}

use contracts::{DictionaryBinding, IteratorBinding, IteratorBindingBuilder, MergeBinding};

struct SliceIter {
    values: Vec<u32>,
    index: usize,
}

#[subject]
impl SliceIter {
    pub fn new(values: Vec<u32>) -> Self {
        Self { values, index: 0 }
    }

    pub fn next(&mut self) -> Option<u32> {
        let value = self.values.get(self.index).copied();
        self.index += 1;
        value
    }

    pub fn remaining(&self) -> usize {
        self.values.len().saturating_sub(self.index)
    }
}

struct Countdown(u64);

#[subject]
impl Countdown {
    pub fn next(&mut self) -> Option<u64> {
        let current = self.0;
        self.0 = current.checked_sub(1)?;
        Some(current)
    }

    pub fn remaining(&self) -> usize {
        self.0 as usize
    }
}

struct Silent;

#[subject]
impl Silent {
    pub fn remaining(&self) -> usize {
        0
    }
}

struct Bag(u32);

#[subject]
impl Bag {
    pub fn merge(&mut self, other: Bag) {
        self.0 += other.0;
    }

    pub fn peek(&self) -> &u32 {
        &self.0
    }
}

struct Dict {
    entries: Vec<(String, String)>,
}

#[subject]
impl Dict {
    pub fn lookup(&self, key: &str) -> &str {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map_or("", |(_, v)| v.as_str())
    }
}

/// Spells out the lifetime `Dict::lookup` elides.
struct Glossary(String);

#[subject]
impl Glossary {
    pub fn lookup<'a>(&'a self, _key: &str) -> &'a str {
        &self.0
    }
}

/// `next` exists but is generic, so it has no single shape.
struct Pending;

#[subject]
impl Pending {
    pub fn next<T: Default>(&mut self) -> Option<T> {
        Some(T::default())
    }

    pub fn remaining(&self) -> usize {
        1
    }
}

fn sum_all<S>(binding: &IteratorBinding<S>, subject: &mut S) -> u32 {
    let mut total = 0;
    while let Some(value) = binding.next(subject) {
        total += value;
    }
    total
}

#[test]
fn natural_match_sums_slice() {
    let binding = IteratorBinding::<SliceIter>::resolve().unwrap();
    let mut iter = SliceIter::new(vec![1, 2, 3, 4, 5]);
    assert_eq!(binding.remaining(&iter), 5);
    assert_eq!(sum_all(&binding, &mut iter), 15);
    assert_eq!(binding.remaining(&iter), 0);
}

#[test]
fn inferred_fields_are_the_subject_members() {
    let binding = IteratorBinding::<SliceIter>::resolve().unwrap();
    assert!(std::ptr::fn_addr_eq(
        binding.next,
        SliceIter::next as fn(&mut SliceIter) -> Option<u32>
    ));
    assert!(std::ptr::fn_addr_eq(
        binding.remaining,
        SliceIter::remaining as fn(&SliceIter) -> usize
    ));
}

#[test]
fn shape_mismatch_fails_default_construction() {
    conform::telemetry::init();
    let err = IteratorBinding::<Countdown>::resolve().unwrap_err();
    match &err {
        DefinitionError::ShapeMismatch {
            contract,
            field,
            found,
            ..
        } => {
            assert_eq!(*contract, "Iterator");
            assert_eq!(*field, "next");
            assert!(found.contains("u64"), "{found}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.field(), Some("next"));
}

#[test]
fn explicit_setter_overrides_mismatch() {
    let builder = IteratorBinding::<Countdown>::builder();
    assert!(!builder.is_complete());
    let binding = builder
        .next(|countdown| countdown.next().map(|value| value as u32))
        .build()
        .unwrap();
    let mut countdown = Countdown(3);
    assert_eq!(sum_all(&binding, &mut countdown), 3 + 2 + 1);
}

#[test]
fn missing_member_is_unbound() {
    let err = IteratorBinding::<Silent>::resolve().unwrap_err();
    assert!(matches!(
        err,
        DefinitionError::Unbound {
            contract: "Iterator",
            field: "next",
            ..
        }
    ));
    assert!(err.to_string().contains("`next`"));
}

#[test]
fn report_records_each_outcome() {
    let builder = IteratorBinding::<Countdown>::builder();
    let report = builder.report();
    assert_eq!(report.contract(), "Iterator");
    assert!(report.subject().ends_with("Countdown"));
    assert!(matches!(
        report.field("next").map(|entry| &entry.outcome),
        Some(Outcome::Mismatch { .. })
    ));
    assert_eq!(
        report.field("remaining").map(|entry| &entry.outcome),
        Some(&Outcome::Inferred)
    );

    let json = serde_json::to_value(report).unwrap();
    assert_eq!(json["fields"][0]["field"], "next");
    assert_eq!(json["fields"][0]["outcome"], "mismatch");
    assert_eq!(json["fields"][1]["outcome"], "inferred");

    let explicit = builder.next(|_| None);
    assert_eq!(
        explicit.report().field("next").map(|entry| &entry.outcome),
        Some(&Outcome::Explicit)
    );
    assert!(explicit.report().is_complete());
}

#[test]
fn empty_builder_requires_every_field() {
    let builder = IteratorBindingBuilder::<SliceIter>::empty();
    assert!(builder
        .report()
        .fields()
        .iter()
        .all(|entry| entry.outcome == Outcome::Unset));
    assert!(matches!(
        IteratorBindingBuilder::<SliceIter>::empty().build(),
        Err(DefinitionError::Unbound { field: "next", .. })
    ));

    let binding = builder
        .next(|iter| iter.next().map(|value| value * 10))
        .remaining(SliceIter::remaining)
        .build()
        .unwrap();
    assert_eq!(sum_all(&binding, &mut SliceIter::new(vec![1, 2])), 30);
}

#[test]
fn binding_converts_back_into_explicit_builder() {
    let binding = IteratorBinding::<SliceIter>::resolve().unwrap();
    let builder = IteratorBindingBuilder::from(binding);
    assert!(builder.is_complete());
    assert!(builder
        .report()
        .fields()
        .iter()
        .all(|entry| entry.outcome == Outcome::Explicit));
}

#[test]
fn contract_lists_operations_only() {
    assert_eq!(<contracts::Iterator as Contract>::NAME, "Iterator");
    assert_eq!(
        contracts::Iterator::REQUIREMENTS,
        &[
            Requirement {
                name: "next",
                receiver: Receiver::Exclusive,
            },
            Requirement {
                name: "remaining",
                receiver: Receiver::Shared,
            },
        ]
    );
    assert_eq!(contracts::Iterator::ITEM_NAME, "u32");
    assert!(contracts::Iterator::requirement("ITEM_NAME").is_none());
}

#[test]
fn subject_publishes_pub_members() {
    use conform::Subject;

    assert_eq!(SliceIter::MEMBERS, &["new", "next", "remaining"]);
    assert!(Silent::has_member("remaining"));
    assert!(!Silent::has_member("next"));
}

#[test]
fn bindings_only_contract_substitutes_self() {
    let binding = MergeBinding::<Bag>::resolve().unwrap();
    let mut bag = Bag(1);
    binding.merge(&mut bag, Bag(2));
    assert_eq!(*binding.peek(&bag), 3);
}

#[test]
fn borrowed_output_follows_receiver() {
    let binding = DictionaryBinding::<Dict>::resolve().unwrap();
    let dict = Dict {
        entries: vec![("a".into(), "alpha".into()), ("b".into(), "beta".into())],
    };
    let key = String::from("b");
    let found = binding.lookup(&dict, &key);
    drop(key);
    assert_eq!(found, "beta");
    assert_eq!(binding.lookup(&dict, "z"), "");

    let glossary = Glossary("term".into());
    let binding = DictionaryBinding::<Glossary>::resolve().unwrap();
    assert_eq!(binding.lookup(&glossary, "anything"), "term");
}

#[test]
fn unshaped_member_reports_mismatch() {
    use conform::Subject;

    assert_eq!(Pending.next::<u32>(), Some(0));
    assert_eq!(Pending::MEMBERS, &["remaining"]);

    let builder = IteratorBinding::<Pending>::builder();
    match builder.report().field("next").map(|entry| &entry.outcome) {
        Some(Outcome::Mismatch { found }) => assert!(found.contains("generic"), "{found}"),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(matches!(
        IteratorBinding::<Pending>::resolve(),
        Err(DefinitionError::ShapeMismatch { field: "next", .. })
    ));
}
