use std::fs;
use std::path::Path;
use std::sync::Arc;

use censo_etl_core::upload::Uploader;
use futures::TryStreamExt;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use tempfile::tempdir;

fn write(path: &Path, content: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

async fn stored_keys(store: &InMemory) -> Vec<String> {
    let mut keys: Vec<String> = store
        .list(None)
        .map_ok(|meta| meta.location.to_string())
        .try_collect()
        .await
        .unwrap();
    keys.sort();
    keys
}

#[tokio::test]
async fn uploads_every_csv_under_a_lowercased_key() {
    let work = tempdir().unwrap();
    let data = work.path().join("microdados_censo_escolar_2020/DADOS");
    write(&data.join("Escola_2020.CSV"), b"escola");
    write(&data.join("TURMAS.csv"), b"turmas");
    write(&data.join("Matricula/MATRICULA_SUL.CSV"), b"matricula");
    write(&data.join("LEIA-ME.pdf"), b"ignored");

    let store = Arc::new(InMemory::new());
    let uploader = Uploader::new(store.clone(), "test-bucket");
    let report = uploader.upload(2020, work.path()).await.expect("upload");

    assert_eq!(report.bucket, "test-bucket");
    assert_eq!(
        stored_keys(&store).await,
        vec![
            "censo-escolar/2020/escola_2020.csv",
            "censo-escolar/2020/matricula/matricula_sul.csv",
            "censo-escolar/2020/turmas.csv",
        ]
    );
    let body = store
        .get(&ObjectPath::from("censo-escolar/2020/escola_2020.csv"))
        .await
        .unwrap()
        .bytes()
        .await
        .unwrap();
    assert_eq!(body.as_ref(), b"escola");
}

#[tokio::test]
async fn uploading_twice_overwrites_instead_of_duplicating() {
    let work = tempdir().unwrap();
    let data = work.path().join("micro_censo_escolar_2013/DADOS");
    write(&data.join("DOCENTES.CSV"), b"v1");

    let store = Arc::new(InMemory::new());
    let uploader = Uploader::new(store.clone(), "test-bucket");

    let first = uploader.upload(2013, work.path()).await.unwrap();
    write(&data.join("DOCENTES.CSV"), b"v2");
    let second = uploader.upload(2013, work.path()).await.unwrap();

    assert_eq!(first.keys(), second.keys());
    assert_eq!(
        stored_keys(&store).await,
        vec!["censo-escolar/2013/docentes.csv"]
    );
    let body = store
        .get(&ObjectPath::from("censo-escolar/2013/docentes.csv"))
        .await
        .unwrap()
        .bytes()
        .await
        .unwrap();
    assert_eq!(body.as_ref(), b"v2");
}

#[tokio::test]
async fn large_files_are_streamed_in_parts() {
    let work = tempdir().unwrap();
    let data = work.path().join("x_2018/DADOS");
    let content = vec![b';'; 9 * 1024 * 1024 + 17];
    write(&data.join("MATRICULA_NORDESTE.CSV"), &content);

    let store = Arc::new(InMemory::new());
    let report = Uploader::new(store.clone(), "test-bucket")
        .upload(2018, work.path())
        .await
        .unwrap();

    assert_eq!(report.uploaded.len(), 1);
    assert_eq!(report.uploaded[0].size, content.len() as u64);
    let meta = store
        .head(&ObjectPath::from("censo-escolar/2018/matricula_nordeste.csv"))
        .await
        .unwrap();
    assert_eq!(meta.size as usize, content.len());
}

#[tokio::test]
async fn other_years_and_non_data_directories_are_ignored() {
    let work = tempdir().unwrap();
    write(&work.path().join("x_2017/DADOS/A.CSV"), b"a");
    write(&work.path().join("x_2016/DADOS/B.CSV"), b"b");
    write(&work.path().join("x_2017/ANEXOS/C.CSV"), b"c");

    let store = Arc::new(InMemory::new());
    let report = Uploader::new(store.clone(), "test-bucket")
        .upload(2017, work.path())
        .await
        .unwrap();

    assert_eq!(report.keys(), vec!["censo-escolar/2017/a.csv"]);
    assert_eq!(stored_keys(&store).await, vec!["censo-escolar/2017/a.csv"]);
}
