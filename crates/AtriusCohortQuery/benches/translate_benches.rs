use atrius_cohort_query::{
    ConceptNode, ContextualTerm, Mapping, MappingContext, StructuredQuery, Term, Translator,
    read_mapping_context, read_structured_query,
};
use chrono::NaiveDate;
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use std::path::Path;
use std::sync::Arc;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
}

fn fixture_translator() -> (Translator, StructuredQuery) {
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures");
    let context = read_mapping_context(
        &fixtures.join("mapping.json"),
        Some(fixtures.join("tree.json").as_path()),
    )
    .unwrap();
    let query = read_structured_query(&fixtures.join("query.json")).unwrap();
    (Translator::new(Arc::new(context)).with_today(today()), query)
}

fn diagnosis(code: &str) -> ContextualTerm {
    ContextualTerm::new(
        Term::new("fdpg.mii.cds", "Diagnose", ""),
        Term::new("http://fhir.de/CodeSystem/bfarm/icd-10-gm", code, ""),
    )
}

/// A three level tree with `width * width` leaves, all of them mapped.
fn wide_context(width: usize) -> MappingContext {
    let mut mappings = Vec::new();
    let chapters = (0..width)
        .map(|i| {
            let leaves = (0..width)
                .map(|j| {
                    let leaf = diagnosis(&format!("E{}.{}", i, j));
                    mappings.push(Mapping::new(leaf.clone(), "Condition"));
                    ConceptNode::leaf(leaf)
                })
                .collect();
            ConceptNode::new(diagnosis(&format!("E{}", i)), leaves)
        })
        .collect();
    MappingContext::new(mappings, Some(ConceptNode::new(diagnosis("E"), chapters)))
}

fn wide_query() -> StructuredQuery {
    serde_json::from_str(
        r#"{"inclusionCriteria": [[{
            "context": {"system": "fdpg.mii.cds", "code": "Diagnose"},
            "termCodes": [{"system": "http://fhir.de/CodeSystem/bfarm/icd-10-gm", "code": "E"}]
        }]]}"#,
    )
    .unwrap()
}

fn bench_translate(c: &mut Criterion) {
    let mut group = c.benchmark_group("translator");

    let (translator, query) = fixture_translator();
    group.bench_function("fixture_query", |b| {
        b.iter(|| translator.translate(black_box(&query)))
    });

    let query = wide_query();
    for width in [5, 20] {
        let translator = Translator::new(Arc::new(wide_context(width))).with_today(today());
        group.bench_function(format!("expanded_concept_{}x{}", width, width), |b| {
            b.iter(|| translator.translate(black_box(&query)))
        });
    }

    group.finish();
}

fn bench_concept_expansion(c: &mut Criterion) {
    let mut group = c.benchmark_group("concept_tree");

    let context = wide_context(50);
    let root = diagnosis("E");
    let tree = context.concept_tree().unwrap();
    group.bench_function("expand_2500_leaves", |b| {
        b.iter(|| tree.expand(black_box(&root)).count())
    });

    group.finish();
}

criterion_group!(benches, bench_translate, bench_concept_expansion);
criterion_main!(benches);
