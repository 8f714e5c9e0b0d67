use std::collections::BTreeSet;

use lei_match::{CandidateIndex, Normalizer, Resolver};
use lei_model::{
    Classification, FullRecord, LoadMode, MatchConfig, MatchMethod, Query, RecordStore,
    ReferenceField, ReferenceTable, SlimRecord,
};

fn record(lei: &str, name: &str, country: &str, status: &str, registry_id: &str) -> FullRecord {
    FullRecord {
        lei: lei.into(),
        legal_name: name.into(),
        other_names: Box::new([]),
        jurisdiction: country.into(),
        entity_status: status.into(),
        registration_status: "ISSUED".into(),
        registration_authority: "".into(),
        registry_entity_id: registry_id.into(),
    }
}

fn table() -> ReferenceTable {
    let rows = vec![
        record("529900T8BM49AURSDO55", "Acme Corporation Ltd", "GB", "ACTIVE", "01234567"),
        record("529900HNOAA1KXQJUQ27", "Acme Holdings Ltd", "GB", "ACTIVE", ""),
        record("969500KSV493XWY0PS54", "Acme SA", "FR", "ACTIVE", "552120222"),
        record("969500ABCDEFGHIJ0001", "Acme SA", "BE", "INACTIVE", ""),
        record("5493001KJTIIGC8Y1R12", "Zenith Bakery GmbH", "DE", "ACTIVE", ""),
        FullRecord {
            other_names: Box::new(["Northwind Traders".into()]),
            ..record("213800NWTRD000000042", "Nordvind Handel AS", "NO", "ACTIVE", "")
        },
    ];
    let fields: BTreeSet<_> = ReferenceField::ALL.into_iter().collect();
    ReferenceTable::new(RecordStore::Full(rows), fields)
}

fn slim_table(names: &[String]) -> ReferenceTable {
    let rows = names
        .iter()
        .enumerate()
        .map(|(i, name)| SlimRecord {
            lei: format!("LEI{i:017}").into(),
            legal_name: name.as_str().into(),
        })
        .collect();
    let fields: BTreeSet<_> = LoadMode::Slim.retained_fields().iter().copied().collect();
    ReferenceTable::new(RecordStore::Slim(rows), fields)
}

struct Fixture {
    table: ReferenceTable,
    index: CandidateIndex,
    normalizer: Normalizer,
}

impl Fixture {
    fn new() -> Self {
        Self::with_table(table())
    }

    fn with_table(table: ReferenceTable) -> Self {
        let normalizer = Normalizer::default();
        let index = CandidateIndex::build(&table, &normalizer);
        Self {
            table,
            index,
            normalizer,
        }
    }

    fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.table, &self.index, &self.normalizer)
    }
}

#[test]
fn acme_example_auto_matches_with_full_confidence() {
    let fixture = Fixture::new();
    let result = fixture
        .resolver()
        .resolve(&Query::new("ACME CORP. LTD"), &MatchConfig::default());
    assert_eq!(result.classification, Classification::AutoMatched);
    assert_eq!(result.lei.as_deref(), Some("529900T8BM49AURSDO55"));
    assert_eq!(result.legal_name.as_deref(), Some("Acme Corporation Ltd"));
    assert_eq!(result.confidence, 1.0);
    assert_eq!(result.method, Some(MatchMethod::Name));
}

#[test]
fn unrelated_name_is_no_match() {
    let fixture = Fixture::new();
    let result = fixture
        .resolver()
        .resolve(&Query::new("Totally Unrelated Shipping"), &MatchConfig::default());
    assert_eq!(result.classification, Classification::NoMatch);
    assert!(result.lei.is_none());
    assert!(result.method.is_none());
}

#[test]
fn equal_scores_prefer_active_entities() {
    let fixture = Fixture::new();
    let result = fixture
        .resolver()
        .resolve(&Query::new("Acme S.A."), &MatchConfig::default());
    assert_eq!(result.classification, Classification::AutoMatched);
    assert_eq!(result.lei.as_deref(), Some("969500KSV493XWY0PS54"));
    assert_eq!(result.alternatives[0].lei, "969500ABCDEFGHIJ0001");
    assert_eq!(result.alternatives[0].score, 1.0);
}

#[test]
fn alternatives_are_capped() {
    let fixture = Fixture::new();
    for cap in 0..4 {
        let config = MatchConfig::default().with_max_alternatives(cap);
        let result = fixture.resolver().resolve(&Query::new("Acme"), &config);
        assert!(result.alternatives.len() <= cap);
    }
}

#[test]
fn raising_thresholds_never_promotes() {
    let fixture = Fixture::new();
    let query = Query::new("Acme Holding");
    let rank = |c: Classification| match c {
        Classification::AutoMatched => 2,
        Classification::NeedsReview => 1,
        _ => 0,
    };
    let mut previous = 3;
    for step in 0..=10 {
        let auto = 0.5 + f64::from(step) * 0.05;
        let config = MatchConfig::default().with_thresholds(auto, auto - 0.1);
        let result = fixture.resolver().resolve(&query, &config);
        let current = rank(result.classification);
        assert!(current <= previous, "threshold {auto} promoted the result");
        previous = current;
    }
}

#[test]
fn registry_id_hit_wins_before_name_matching() {
    let fixture = Fixture::new();
    let query = Query::new("Some Other Name").with_registry_id("RCS Paris 552 120 222");
    let result = fixture.resolver().resolve(&query, &MatchConfig::default());
    assert_eq!(result.classification, Classification::AutoMatched);
    assert_eq!(result.method, Some(MatchMethod::RegistryId));
    assert_eq!(result.lei.as_deref(), Some("969500KSV493XWY0PS54"));
    assert_eq!(result.confidence, 1.0);
}

#[test]
fn unknown_registry_id_falls_back_to_name() {
    let fixture = Fixture::new();
    let query = Query::new("Acme Corporation Ltd").with_registry_id("99999999");
    let result = fixture.resolver().resolve(&query, &MatchConfig::default());
    assert_eq!(result.method, Some(MatchMethod::Name));
    assert_eq!(result.lei.as_deref(), Some("529900T8BM49AURSDO55"));
}

#[test]
fn country_restricts_candidates() {
    let fixture = Fixture::new();
    let query = Query::new("Acme SA").with_country("Belgique");
    let result = fixture.resolver().resolve(&query, &MatchConfig::default());
    assert_eq!(result.lei.as_deref(), Some("969500ABCDEFGHIJ0001"));
    assert!(result.alternatives.is_empty());

    let unknown = Query::new("Acme SA").with_country("Atlantis");
    let result = fixture.resolver().resolve(&unknown, &MatchConfig::default());
    assert_eq!(result.lei.as_deref(), Some("969500KSV493XWY0PS54"));
    assert!(
        result
            .diagnostic
            .as_deref()
            .is_some_and(|d| d.contains("Atlantis"))
    );
}

#[test]
fn empty_query_is_no_match() {
    let fixture = Fixture::new();
    for name in ["", "   ", "--"] {
        let result = fixture
            .resolver()
            .resolve(&Query::new(name), &MatchConfig::default());
        assert_eq!(result.classification, Classification::NoMatch);
        assert!(result.alternatives.is_empty());
    }
}

#[test]
fn exact_name_auto_matches_among_many_token_sharing_records() {
    let mut names: Vec<String> = (0..150)
        .map(|i| format!("Acme Subsidiary {i} Ltd"))
        .collect();
    names.push("Acme Ltd".to_string());
    let fixture = Fixture::with_table(slim_table(&names));

    let result = fixture
        .resolver()
        .resolve(&Query::new("ACME LTD"), &MatchConfig::default());
    assert_eq!(result.classification, Classification::AutoMatched);
    assert_eq!(result.lei.as_deref(), Some("LEI00000000000000150"));
    assert_eq!(result.confidence, 1.0);
}

#[test]
fn other_registered_name_resolves_to_legal_name() {
    let fixture = Fixture::new();
    let result = fixture
        .resolver()
        .resolve(&Query::new("NORTHWIND TRADERS"), &MatchConfig::default());
    assert_eq!(result.classification, Classification::AutoMatched);
    assert_eq!(result.lei.as_deref(), Some("213800NWTRD000000042"));
    assert_eq!(result.legal_name.as_deref(), Some("Nordvind Handel AS"));
    assert_eq!(result.confidence, 1.0);
}

#[test]
fn matched_entity_details_and_query_echo() {
    let fixture = Fixture::new();
    let query = Query::new("Acme SA")
        .with_registry_id("RCS Paris 552 120 222")
        .with_country("France");
    let result = fixture.resolver().resolve(&query, &MatchConfig::default());
    assert_eq!(result.input_registry_id.as_deref(), Some("RCS Paris 552 120 222"));
    assert_eq!(result.input_country.as_deref(), Some("France"));
    let entity = result.entity.expect("full record details");
    assert_eq!(entity.jurisdiction.as_deref(), Some("FR"));
    assert_eq!(entity.entity_status.as_deref(), Some("ACTIVE"));
    assert_eq!(entity.registration_status.as_deref(), Some("ISSUED"));
    assert_eq!(entity.registry_id.as_deref(), Some("552120222"));
    assert_eq!(entity.registration_authority, None);

    let none = fixture
        .resolver()
        .resolve(&Query::new("Totally Unrelated Shipping"), &MatchConfig::default());
    assert!(none.entity.is_none());
}

#[test]
fn country_on_slim_table_is_reported_as_ignored() {
    let names = vec!["Acme SA".to_string()];
    let fixture = Fixture::with_table(slim_table(&names));
    let query = Query::new("Acme SA").with_country("France");
    let result = fixture.resolver().resolve(&query, &MatchConfig::default());
    assert_eq!(result.classification, Classification::AutoMatched);
    assert!(result.entity.is_none());
    assert!(
        result
            .diagnostic
            .as_deref()
            .is_some_and(|d| d.contains("France") && d.contains("ignored"))
    );
}
