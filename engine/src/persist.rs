use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::index::CorpusIndex;

#[derive(Debug, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_terms: u32,
    pub avgdl: f32,
    pub created_at: String,
    pub version: u32,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn index(&self) -> PathBuf {
        self.root.join("index.bin")
    }

    fn meta(&self) -> PathBuf {
        self.root.join("meta.json")
    }
}

pub fn save_index(paths: &IndexPaths, index: &CorpusIndex) -> Result<()> {
    create_dir_all(&paths.root)?;
    let bytes = bincode::serialize(index).context("serializing index")?;
    let mut f = File::create(paths.index())?;
    f.write_all(&bytes)?;
    Ok(())
}

pub fn load_index(paths: &IndexPaths) -> Result<CorpusIndex> {
    let mut f = File::open(paths.index())
        .with_context(|| format!("opening index payload {}", paths.index().display()))?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let index = bincode::deserialize(&buf).context("deserializing index")?;
    Ok(index)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let json = serde_json::to_string_pretty(meta)?;
    let mut f = File::create(paths.meta())?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta())
        .with_context(|| format!("opening index meta {}", paths.meta().display()))?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}
