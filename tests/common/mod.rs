#![allow(dead_code)]

use bkm_core::{BkmResult, Store, StoreConfig, Tree};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

/// Routes library events to the test output. Set `RUST_LOG` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Opens a fresh database inside `tmpdir`.
pub async fn open_store(tmpdir: &TempDir) -> BkmResult<Store> {
    init_tracing();
    Store::open(&StoreConfig::at(tmpdir.path().join("bkm.db"))).await
}

pub async fn open_tree(tmpdir: &TempDir) -> BkmResult<Tree> {
    Ok(Tree::without_favicons(open_store(tmpdir).await?))
}
