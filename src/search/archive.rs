//! Binary archive of named arrays used to persist the embedding matrix.
//!
//! Layout: a bincode-encoded list of `{name, shape, data}` records. The
//! vector index writes two arrays, `ids` of shape `[n]` and `embeddings` of
//! shape `[n, vocabulary_size]` (row-major).

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{RagError, Result};
use crate::models::DocumentId;

pub const IDS_ARRAY: &str = "ids";
pub const EMBEDDINGS_ARRAY: &str = "embeddings";

#[derive(Debug, Clone, Serialize, Deserialize)]
enum ArrayData {
    U64(Vec<u64>),
    F32(Vec<f32>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct NamedArray {
    name: String,
    shape: Vec<usize>,
    data: ArrayData,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Archive {
    arrays: Vec<NamedArray>,
}

impl Archive {
    fn take(&mut self, name: &str) -> Option<NamedArray> {
        let pos = self.arrays.iter().position(|a| a.name == name)?;
        Some(self.arrays.swap_remove(pos))
    }
}

/// Embedding matrix as read back from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEmbeddings {
    pub ids: Vec<DocumentId>,
    /// Row-major `[ids.len(), cols]` data.
    pub data: Vec<f32>,
    pub cols: usize,
}

impl StoredEmbeddings {
    pub fn rows(&self) -> impl Iterator<Item = (DocumentId, &[f32])> + '_ {
        let cols = self.cols;
        self.ids
            .iter()
            .enumerate()
            .map(move |(i, id)| (*id, &self.data[i * cols..(i + 1) * cols]))
    }
}

/// Write `ids` and their rows to `path`, replacing any previous archive.
pub fn write_embeddings<'a>(
    path: &Path,
    cols: usize,
    rows: impl ExactSizeIterator<Item = (DocumentId, &'a [f32])>,
) -> Result<()> {
    let n = rows.len();
    let mut ids = Vec::with_capacity(n);
    let mut data = Vec::with_capacity(n * cols);
    for (id, row) in rows {
        if row.len() != cols {
            return Err(RagError::InvalidInput(format!(
                "row for document {id} has {} columns, expected {cols}",
                row.len()
            )));
        }
        ids.push(id.0);
        data.extend_from_slice(row);
    }

    let archive = Archive {
        arrays: vec![
            NamedArray {
                name: IDS_ARRAY.to_string(),
                shape: vec![n],
                data: ArrayData::U64(ids),
            },
            NamedArray {
                name: EMBEDDINGS_ARRAY.to_string(),
                shape: vec![n, cols],
                data: ArrayData::F32(data),
            },
        ],
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let bytes = bincode::serialize(&archive)?;
    let tmp_path = path.with_extension("bin.tmp");
    std::fs::write(&tmp_path, bytes)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Read an archive written by [`write_embeddings`], checking array shapes.
pub fn read_embeddings(path: &Path) -> Result<StoredEmbeddings> {
    let bytes = std::fs::read(path)?;
    let mut archive: Archive = bincode::deserialize(&bytes)?;

    let ids = match archive.take(IDS_ARRAY) {
        Some(NamedArray {
            shape,
            data: ArrayData::U64(ids),
            ..
        }) if shape == [ids.len()] => ids,
        Some(_) => return Err(corrupt("`ids` array has the wrong type or shape")),
        None => return Err(corrupt("missing `ids` array")),
    };

    let (cols, data) = match archive.take(EMBEDDINGS_ARRAY) {
        Some(NamedArray {
            shape,
            data: ArrayData::F32(data),
            ..
        }) if shape.len() == 2
            && shape[0] == ids.len()
            && shape[0].checked_mul(shape[1]) == Some(data.len()) =>
        {
            (shape[1], data)
        }
        Some(_) => return Err(corrupt("`embeddings` array has the wrong type or shape")),
        None => return Err(corrupt("missing `embeddings` array")),
    };

    Ok(StoredEmbeddings {
        ids: ids.into_iter().map(DocumentId).collect(),
        data,
        cols,
    })
}

fn corrupt(msg: &str) -> RagError {
    RagError::StorageCorrupt(format!("vector archive: {msg}"))
}
