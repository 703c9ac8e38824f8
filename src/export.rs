//! NumPy `.npy` import and export of label rasters.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use ndarray::Array2;
use ndarray_npy::{ReadNpyExt, WriteNpyExt};

use crate::error::Result;
use crate::render::LabelRaster;

/// Write a raster as `.npy`: index images as `int32`, multichannel as `bool`.
pub fn write_raster<W: Write>(raster: &LabelRaster, writer: W) -> Result<()> {
    match raster {
        LabelRaster::Indexed(a) => a.write_npy(writer)?,
        LabelRaster::Multichannel(a) => a.write_npy(writer)?,
    }
    Ok(())
}

/// Write a raster to a `.npy` file.
pub fn save_raster(raster: &LabelRaster, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    write_raster(raster, BufWriter::new(file))?;
    let (h, w) = raster.size();
    log::info!("Saved {}x{} label raster to {}", w, h, path.display());
    Ok(())
}

/// Read an `int32` label image, as consumed by
/// [`LabelCollection::from_label_image`](crate::model::LabelCollection::from_label_image).
pub fn read_label_image<R: Read>(reader: R) -> Result<Array2<i32>> {
    Ok(Array2::<i32>::read_npy(reader)?)
}

/// Read an `int32` label image from a `.npy` file.
pub fn load_label_image(path: &Path) -> Result<Array2<i32>> {
    let file = File::open(path)?;
    let image = read_label_image(BufReader::new(file))?;
    log::debug!("Loaded {:?} label image from {}", image.dim(), path.display());
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LabelError;
    use ndarray::{Array3, array};

    #[test]
    fn test_indexed_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("classes.npy");
        let image = array![[0, 1, 1], [2, 0, 3]];
        save_raster(&LabelRaster::Indexed(image.clone()), &path).unwrap();
        assert_eq!(load_label_image(&path).unwrap(), image);
    }

    #[test]
    fn test_multichannel_written_as_bool() {
        let mut planes = Array3::<bool>::from_elem((2, 3, 2), false);
        planes[[1, 2, 1]] = true;
        let mut buf = Vec::new();
        write_raster(&LabelRaster::Multichannel(planes.clone()), &mut buf).unwrap();
        let back = Array3::<bool>::read_npy(buf.as_slice()).unwrap();
        assert_eq!(back, planes);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_label_image(&dir.path().join("absent.npy")).unwrap_err();
        assert!(matches!(err, LabelError::Io(_)));
    }

    #[test]
    fn test_wrong_dtype() {
        let mut buf = Vec::new();
        array![[1.5f64, 2.0]].write_npy(&mut buf).unwrap();
        let err = read_label_image(buf.as_slice()).unwrap_err();
        assert!(matches!(err, LabelError::NpyRead(_)));
    }
}
