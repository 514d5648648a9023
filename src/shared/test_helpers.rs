#[cfg(test)]
use std::fs;
#[cfg(test)]
use std::path::Path;
#[cfg(test)]
use std::sync::Arc;

#[cfg(test)]
use tokio_util::sync::CancellationToken;

#[cfg(test)]
use crate::features::regions::services::{BulkLoader, LoadOptions, SourceReader};
#[cfg(test)]
use crate::modules::store::MemoryRegionStore;

/// Writes a source unit under `<root>/<dir>/<file>`
#[cfg(test)]
pub fn write_unit(root: &Path, dir: &str, file: &str, body: &str) {
    let dir = root.join(dir);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(file), body).unwrap();
}

/// Small but complete source tree: Aceh with two regencies, three districts
/// and four villages, plus a second province without children
#[cfg(test)]
pub fn aceh_fixture(root: &Path) {
    write_unit(
        root,
        "provinsi",
        "provinsi.json",
        r#"{"11": "Aceh", "12": "Sumatera Utara"}"#,
    );
    write_unit(
        root,
        "kabupaten_kota",
        "kab-11.json",
        r#"{"01": "Aceh Selatan", "02": "Aceh Tenggara"}"#,
    );
    write_unit(
        root,
        "kecamatan",
        "kec-11-01.json",
        r#"{"01": "Bakongan", "02": "Kluet Utara"}"#,
    );
    write_unit(root, "kecamatan", "kec-11-02.json", r#"{"01": "Lawe Alas"}"#);
    write_unit(
        root,
        "kelurahan_desa",
        "keldesa-11-01-01.json",
        r#"{"2001": "Keude Bakongan", "2002": "Ujong Mangki"}"#,
    );
    write_unit(
        root,
        "kelurahan_desa",
        "keldesa-11-01-02.json",
        r#"{"2001": "Fajar Harapan"}"#,
    );
    write_unit(
        root,
        "kelurahan_desa",
        "keldesa-11-02-01.json",
        r#"{"2001": "Lawe Sigala"}"#,
    );
}

/// Memory store holding the loaded Aceh fixture
#[cfg(test)]
pub async fn seeded_store() -> Arc<MemoryRegionStore> {
    let dir = tempfile::tempdir().unwrap();
    aceh_fixture(dir.path());

    let store = Arc::new(MemoryRegionStore::new());
    let report = BulkLoader::new(store.clone())
        .load_source(
            SourceReader::new(dir.path()),
            &LoadOptions::default(),
            &CancellationToken::new(),
        )
        .await;
    assert!(!report.is_aborted(), "fixture load aborted: {:?}", report.fatal);
    store
}
