// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use std::path::Path;

use npyz::{self, DType, NpyFile, TypeChar, WriterBuilder};

use crate::error::AuError;
use crate::source::Landmarks;
use crate::ut;

/// Write a numpy file from a vector of specified shape
///
/// # Arguments
///
/// * `path` - Path to output numpy file
/// * `data` - Vector of numeric type
/// * `shape` - Shape of the vector (shape product must equal length of data)
pub fn write_numpy<T, P: AsRef<Path>>(path: P, data: &[T], shape: &[u64]) -> Result<(), AuError>
where
    T: npyz::Serialize + npyz::AutoSerialize,
{
    let path = path.as_ref();

    if shape.iter().product::<u64>() != data.len() as u64 {
        return Err(AuError::MeshWriteError(format!(
            "Shape {:?} does not match {} values",
            shape,
            data.len()
        )));
    }

    let mut buffer = vec![];
    let mut writer = npyz::WriteOptions::<T>::new()
        .default_dtype()
        .shape(shape)
        .writer(&mut buffer)
        .begin_nd()
        .map_err(|err| AuError::MeshWriteError(err.to_string()))?;

    for value in data {
        writer
            .push(value)
            .map_err(|err| AuError::MeshWriteError(err.to_string()))?;
    }

    writer
        .finish()
        .map_err(|err| AuError::MeshWriteError(err.to_string()))?;

    ut::path::write_atomic(path, &buffer)
        .map_err(|err| AuError::MeshWriteError(format!("{}: {}", path.display(), err)))
}

/// Write landmarks as an (n, 3) float64 numpy array
pub fn write_mesh<P: AsRef<Path>>(path: P, landmarks: &Landmarks) -> Result<(), AuError> {
    write_numpy(path, &landmarks.to_flat(), &[landmarks.len() as u64, 3])
}

/// Read an (n, 3) float32 or float64 numpy array as landmarks
pub fn read_mesh<P: AsRef<Path>>(path: P) -> Result<Landmarks, AuError> {
    let path = path.as_ref();
    let error = |message: String| AuError::MeshReadError(format!("{}: {}", path.display(), message));

    let bytes = std::fs::read(path).map_err(|err| error(err.to_string()))?;
    let npy = NpyFile::new(&bytes[..]).map_err(|err| error(err.to_string()))?;

    let shape = npy.shape().to_vec();
    if shape.len() != 2 || shape[1] != 3 {
        return Err(error(format!("expected an (n, 3) array but found {:?}", shape)));
    }

    let values: Vec<f64> = match npy.dtype() {
        DType::Plain(x) => match (x.type_char(), x.size_field()) {
            (TypeChar::Float, 8) => npy.into_vec::<f64>().map_err(|err| error(err.to_string()))?,
            (TypeChar::Float, 4) => npy
                .into_vec::<f32>()
                .map_err(|err| error(err.to_string()))?
                .into_iter()
                .map(f64::from)
                .collect(),
            _ => return Err(error("mesh arrays must be float32 or float64".to_string())),
        },
        _ => return Err(error("only plain numpy arrays are supported".to_string())),
    };

    let points = values
        .chunks_exact(3)
        .map(|chunk| [chunk[0], chunk[1], chunk[2]])
        .collect();

    Landmarks::new(points).map_err(|err| error(err.to_string()))
}
