use std::fs::File;
use std::io::{
    BufReader,
    BufWriter,
    Write,
};
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::errors::StoreError;

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let file = File::open(path).map_err(|e| StoreError::Io {
        source: e,
        path: path.to_path_buf(),
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| {
        if e.is_io() {
            StoreError::Io {
                source: e.into(),
                path: path.to_path_buf(),
            }
        } else {
            StoreError::Parse {
                msg: e.to_string(),
                path: path.to_path_buf(),
            }
        }
    })
}

pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let io_err = |e: std::io::Error| StoreError::Io {
        source: e,
        path: path.to_path_buf(),
    };
    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|e| io_err(e.into()))?;
    writer.flush().map_err(io_err)
}
