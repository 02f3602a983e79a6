#![allow(missing_docs)]

use std::fs;

use dynasty::{
    catalog::{Dataset, Model, Series, Tech},
    demo::demo_dataset,
    persist::{flat, FlatFile, Persistence},
    store::{Catalog, CatalogOptions, StoreError},
    types::ConstraintKind,
};
use proptest::prelude::*;
use tempfile::TempDir;

#[test]
fn demo_survives_save_and_reopen() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("catalog.txt");
    let file = FlatFile::new(&path);
    file.save_all(&demo_dataset()).expect("save demo");

    let catalog = Catalog::open(FlatFile::new(&path), CatalogOptions::default()).expect("open");
    assert_eq!(catalog.store().snapshot(), demo_dataset());
    let report = catalog.store().verify();
    assert!(report.success, "findings: {:?}", report.findings);
}

#[test]
fn mutations_are_written_through() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("catalog.txt");
    let catalog = Catalog::open(FlatFile::new(&path), CatalogOptions::default()).expect("open");
    assert!(!path.exists(), "opening a missing file must not create it");

    catalog.add_series(Series::new(1, "王朝", "")).expect("series");
    catalog
        .add_tech(Tech::new(102, "刀片电池", "磷酸铁锂, 长寿命"))
        .expect("tech");
    catalog
        .add_model(Model::new(9001, "汉EV", 1, 20.98, "EV"), &[102])
        .expect("model");

    let text = fs::read_to_string(&path).expect("read back");
    assert!(text.contains("102,刀片电池,\"磷酸铁锂, 长寿命\""));
    assert!(text.contains("9001,102"));

    let reopened = Catalog::open(FlatFile::new(&path), CatalogOptions::default()).expect("reopen");
    let detail = reopened.store().model_detail(9001).expect("han");
    assert_eq!(detail.techs, vec!["刀片电池"]);
    assert_eq!(detail.model.price, 20.98);
}

#[test]
fn rejected_mutation_leaves_file_untouched() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("catalog.txt");
    FlatFile::new(&path)
        .save_all(&demo_dataset())
        .expect("save demo");
    let before = fs::read_to_string(&path).expect("read");

    let catalog = Catalog::open(FlatFile::new(&path), CatalogOptions::default()).expect("open");
    let err = catalog
        .add_model(Model::new(9100, "海豹", 2, 18.0, "EV"), &[101])
        .expect_err("duplicate name");
    assert!(matches!(err, StoreError::Constraint(_)));
    assert_eq!(err.constraint_kind(), Some(ConstraintKind::UniqueViolation));
    assert_eq!(fs::read_to_string(&path).expect("read"), before);
}

#[test]
fn inline_tech_list_and_unknown_sections_load() {
    let text = "\
# hand-written
[SERIES]
1, 王朝 , 以朝代命名
[TECH]
100,DM-i超级混动,
102,刀片电池,
[DEALERS]
1,深圳
[MODEL]
9002,汉DM-i,1,18.98,121,PHEV,轿车,5,2022,100|102
";
    let data = flat::parse(text).expect("parse");
    assert_eq!(data.series[0].name, " 王朝 ");
    assert_eq!(data.associations, vec![(9002, 100), (9002, 102)]);
    let tables = data.to_tables(true).expect("strict load");
    assert!(tables.has_association(9002, 102));
}

#[test]
fn strict_reload_rejects_unbound_model_file() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("catalog.txt");
    fs::write(
        &path,
        "[SERIES]\n1,王朝,\n[MODEL]\n9001,汉EV,1,20.98,605,EV,轿车,5,2020\n",
    )
    .expect("write");

    let lenient = Catalog::open(FlatFile::new(&path), CatalogOptions::default());
    assert!(lenient.is_ok());

    let strict = Catalog::open(
        FlatFile::new(&path),
        CatalogOptions {
            strict_reload: true,
            ..CatalogOptions::default()
        },
    );
    let err = strict.err().expect("strict load fails");
    assert_eq!(err.constraint_kind(), Some(ConstraintKind::BusinessRuleViolation));
}

#[test]
fn delimiters_and_padding_survive_reopen() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("catalog.txt");
    let catalog = Catalog::open(FlatFile::new(&path), CatalogOptions::default()).expect("open");
    catalog
        .add_series(Series::new(1, "王朝,Dynasty", "汉\n唐"))
        .expect("series");
    catalog
        .add_tech(Tech::new(100, " 刀片电池 ", "\"LFP\"|磷酸铁锂"))
        .expect("tech");
    let mut han = Model::new(9001, "汉,EV", 1, 20.98, "EV");
    han.body_type = "轿车|四门".into();
    catalog.add_model(han, &[100]).expect("model");
    let before = catalog.store().snapshot();
    drop(catalog);

    let reopened = Catalog::open(FlatFile::new(&path), CatalogOptions::default()).expect("reopen");
    assert_eq!(reopened.store().snapshot(), before);
    let detail = reopened.store().model_detail(9001).expect("han");
    assert_eq!(detail.model.name, "汉,EV");
    assert_eq!(detail.model.body_type, "轿车|四门");
    assert_eq!(detail.series_name, "王朝,Dynasty");
    assert_eq!(detail.techs, vec![" 刀片电池 "]);
}

fn arb_text() -> impl Strategy<Value = String> {
    let alphabet = vec![
        '汉', '唐', 'E', 'V', ',', '|', '"', ' ', '\t', '\n', '\r', '#', '[', ']',
    ];
    prop::collection::vec(prop::sample::select(alphabet), 0..10)
        .prop_map(|chars| chars.into_iter().collect::<String>())
}

fn arb_dataset() -> impl Strategy<Value = Dataset> {
    (
        prop::collection::vec((arb_text(), arb_text()), 0..4),
        prop::collection::vec((arb_text(), arb_text()), 0..4),
        prop::collection::vec((arb_text(), arb_text(), arb_text(), 0.01f64..500.0), 0..4),
    )
        .prop_map(|(series, techs, models)| Dataset {
            series: series
                .into_iter()
                .zip(1..)
                .map(|((name, intro), id)| Series::new(id, name, intro))
                .collect(),
            techs: techs
                .into_iter()
                .zip(100..)
                .map(|((name, intro), id)| Tech::new(id, name, intro))
                .collect(),
            models: models
                .into_iter()
                .zip(9001..)
                .map(|((name, body_type, launch_year, price), id)| {
                    let mut model = Model::new(id, name, 1, price, "EV");
                    model.body_type = body_type;
                    model.launch_year = launch_year;
                    model
                })
                .collect(),
            associations: vec![(9001, 100)],
        })
}

proptest! {
    #[test]
    fn any_text_survives_save_and_load(data in arb_dataset()) {
        let dir = TempDir::new().expect("tempdir");
        let file = FlatFile::new(dir.path().join("catalog.txt"));
        file.save_all(&data).expect("save");
        prop_assert_eq!(file.load_all().expect("load"), data);
    }
}
