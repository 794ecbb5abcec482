//! End-to-end export and import of CSV bundles.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use chrono::NaiveDate;
use csvbundle::io::{
    ArchiveWriter, ExportOptions, ExportService, ExportablePack, FixedClock, ImportOptions,
    ImportPack, ImportService, PathPicker, ResultMap,
};
use csvbundle::schema::{Column, Convertible, Row};
use csvbundle::Error;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
struct Person {
    name: String,
    age: u32,
}

impl Convertible for Person {
    const SAVE_BASE_NAME: &'static str = "people";

    fn columns() -> Vec<Column<Self>> {
        vec![
            Column::value("Name", |p: &Self| p.name.clone()),
            Column::value("Age", |p: &Self| p.age),
        ]
    }

    fn parse_row(row: &Row) -> csvbundle::Result<Self> {
        Ok(Self {
            name: row.require("Name")?.to_string(),
            age: row.parse("Age")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Pet {
    name: String,
    species: String,
    owner: Option<String>,
}

impl Convertible for Pet {
    const SAVE_BASE_NAME: &'static str = "pets";

    fn columns() -> Vec<Column<Self>> {
        vec![
            Column::value("Pet Name", |p: &Self| p.name.clone()),
            Column::value("Species", |p: &Self| p.species.clone()),
            Column::optional("Owner", |p: &Self| p.owner.clone()),
        ]
    }

    fn parse_row(row: &Row) -> csvbundle::Result<Self> {
        Ok(Self {
            name: row.require("Pet Name")?.to_string(),
            species: row.require("Species")?.to_string(),
            owner: row.parse_optional("Owner")?,
        })
    }
}

fn person(name: &str, age: u32) -> Person {
    Person {
        name: name.to_string(),
        age,
    }
}

fn clock() -> Arc<FixedClock> {
    let at = NaiveDate::from_ymd_opt(2024, 3, 7)
        .unwrap()
        .and_hms_opt(9, 5, 1)
        .unwrap();
    Arc::new(FixedClock(at))
}

fn exporter(staging: &Path) -> (ExportService, Arc<Mutex<Vec<PathBuf>>>) {
    let shared = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&shared);
    let service = ExportService::new(ExportOptions::default().with_staging_dir(staging))
        .with_clock(clock())
        .with_share_target(Arc::new(move |path: &Path| {
            sink.lock().unwrap().push(path.to_path_buf());
        }));
    (service, shared)
}

fn import_file(path: &Path, extraction: &Path, packs: &[ImportPack]) -> ResultMap {
    let service = ImportService::new(ImportOptions::default().with_extraction_dir(extraction));
    let (map, _) = service
        .import_archive(File::open(path).unwrap(), packs, None)
        .unwrap();
    map
}

#[test]
fn test_people_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let (service, shared) = exporter(&dir.path().join("staging"));
    let people = vec![person("Ann", 30), person("Bo", 41)];

    let pack = service.pack(&people).unwrap();
    assert_eq!(pack.file_name(), "people_20240307090501.csv");
    let result = service.export(&[&pack]).unwrap();

    let archive = result.archive.clone().unwrap();
    assert!(archive.ends_with("export-2024-03-07.zip"));
    assert_eq!(shared.lock().unwrap().as_slice(), &[archive.clone()]);
    assert_eq!(result.files.len(), 1);
    assert_eq!(result.files[0].rows, 2);

    let map = import_file(&archive, &dir.path().join("extract"), &[ImportPack::of::<Person>()]);
    assert_eq!(map.get::<Person>(), people.as_slice());
}

#[test]
fn test_two_types_in_one_archive() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _) = exporter(&dir.path().join("staging"));
    let people = vec![person("Ann", 30)];
    let pets = vec![
        Pet {
            name: "Rex".to_string(),
            species: "dog".to_string(),
            owner: Some("Ann".to_string()),
        },
        Pet {
            name: "Tom, the cat".to_string(),
            species: "cat".to_string(),
            owner: None,
        },
    ];

    let people_pack = service.pack(&people).unwrap();
    let pets_pack = service.pack(&pets).unwrap();
    let result = service.export(&[&people_pack, &pets_pack]).unwrap();
    assert_eq!(result.files.len(), 2);
    assert!(!result.has_failures());

    // Registration order differs from archive order on purpose.
    let map = import_file(
        &result.archive.unwrap(),
        &dir.path().join("extract"),
        &[ImportPack::of::<Pet>(), ImportPack::of::<Person>()],
    );
    assert_eq!(map.len(), 2);
    assert_eq!(map.get::<Person>(), people.as_slice());
    assert_eq!(map.get::<Pet>(), pets.as_slice());
}

#[test]
fn test_reordered_columns_still_match() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("manual.zip");
    let mut writer = ArchiveWriter::create(&archive).unwrap();
    writer
        .add_bytes("whatever.csv", b"Age,Name\n30,Ann\n41,Bo\n")
        .unwrap();
    writer.finish().unwrap();

    let map = import_file(&archive, &dir.path().join("extract"), &[ImportPack::of::<Person>()]);
    assert_eq!(map.get::<Person>(), &[person("Ann", 30), person("Bo", 41)]);
}

#[test]
fn test_later_entry_replaces_earlier() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("twice.zip");
    let mut writer = ArchiveWriter::create(&archive).unwrap();
    writer.add_bytes("a.csv", b"Name,Age\nAnn,30\n").unwrap();
    writer.add_bytes("b.csv", b"Name,Age\nBo,41\nCy,52\n").unwrap();
    writer.finish().unwrap();

    let service = ImportService::new(
        ImportOptions::default().with_extraction_dir(dir.path().join("extract")),
    );
    let (map, result) = service
        .import_archive(File::open(&archive).unwrap(), &[ImportPack::of::<Person>()], None)
        .unwrap();

    assert_eq!(result.matched, 2);
    assert_eq!(result.overwritten, 1);
    assert_eq!(map.get::<Person>(), &[person("Bo", 41), person("Cy", 52)]);
}

#[test]
fn test_empty_collection_imports_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _) = exporter(&dir.path().join("staging"));
    let nobody: Vec<Person> = Vec::new();

    let pack = service.pack(&nobody).unwrap();
    let result = service.export(&[&pack]).unwrap();
    assert_eq!(result.files[0].rows, 0);

    let map = import_file(
        &result.archive.unwrap(),
        &dir.path().join("extract"),
        &[ImportPack::of::<Person>()],
    );
    assert!(map.get::<Person>().is_empty());
}

#[test]
fn test_bad_entry_is_reported_and_others_survive() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("mixed.zip");
    let mut writer = ArchiveWriter::create(&archive).unwrap();
    writer.add_bytes("people.csv", b"Name,Age\nAnn,thirty\n").unwrap();
    writer
        .add_bytes("pets.csv", b"Pet Name,Species,Owner\nRex,dog,\n")
        .unwrap();
    writer.add_bytes("unknown.csv", b"Colour\nred\n").unwrap();
    writer.finish().unwrap();

    let service = ImportService::new(
        ImportOptions::default().with_extraction_dir(dir.path().join("extract")),
    );
    let mut reported = Vec::new();
    let mut on_error = |entry: &str, err: &Error| {
        assert!(matches!(err, Error::Parse { .. }));
        reported.push(entry.to_string());
    };
    let mut completed = None;
    let result = service
        .import(
            File::open(&archive).unwrap(),
            &[ImportPack::of::<Person>(), ImportPack::of::<Pet>()],
            Some(&mut on_error),
            |map| completed = Some(map),
        )
        .unwrap();

    assert_eq!(reported, vec!["people.csv"]);
    assert_eq!(result.entries_seen, 3);
    assert_eq!(result.failed, 1);
    assert_eq!(result.skipped_unrecognized, 1);

    let map = completed.unwrap();
    assert!(map.get::<Person>().is_empty());
    assert_eq!(map.get::<Pet>()[0].owner, None);
}

#[test]
fn test_import_from_picker() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _) = exporter(&dir.path().join("staging"));
    let people = vec![person("Ann", 30)];
    let pack = service.pack(&people).unwrap();
    let archive = service.export(&[&pack]).unwrap().archive.unwrap();

    let importer = ImportService::new(
        ImportOptions::default().with_extraction_dir(dir.path().join("extract")),
    );
    let mut imported = Vec::new();
    let result = importer
        .import_picked(
            &mut PathPicker::new(&archive),
            &[ImportPack::of::<Person>()],
            None,
            |mut map| imported = map.take::<Person>(),
        )
        .unwrap();
    assert!(result.is_some());
    assert_eq!(imported, people);

    let cancelled = importer
        .import_picked(
            &mut PathPicker::cancelled(),
            &[ImportPack::of::<Person>()],
            None,
            |_| panic!("completion must not run on cancel"),
        )
        .unwrap();
    assert!(cancelled.is_none());
}

#[test]
fn test_staging_directory_is_clean_after_export() {
    let dir = tempfile::tempdir().unwrap();
    let staging = dir.path().join("staging");
    let (service, _) = exporter(&staging);
    let people = vec![person("Ann", 30)];

    let pack = service.pack(&people).unwrap();
    let archive = service.export(&[&pack]).unwrap().archive.unwrap();

    let leftovers: Vec<_> = std::fs::read_dir(&staging)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p != &archive)
        .collect();
    assert!(leftovers.is_empty(), "staged files left behind: {leftovers:?}");
}
