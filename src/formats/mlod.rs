//! Texture and material names of editable (MLOD) models.
//!
//! Layout: `"MLOD"`, version, LOD count, then per LOD a `"P3DM"` block with
//! points (16 bytes each), normals (12 bytes each) and faces. Each face is
//! a side count, four 16-byte vertex records, flags, and then the texture
//! and material names as zero-terminated strings. A LOD ends with a
//! `"TAGG"` section of named tags, the last one called `#EndOfFile#`,
//! followed by the LOD's resolution.

use anyhow::{Context, Result, bail};

use super::DependencyList;
use super::cursor::ByteCursor;

const POINT_SIZE: usize = 16;
const NORMAL_SIZE: usize = 12;
const VERTEX_SIZE: usize = 16;
const END_OF_FILE_TAG: &str = "#EndOfFile#";

/// Face textures and materials of an MLOD model, in first-seen order.
pub fn dependencies(data: &[u8]) -> Result<Vec<String>> {
    let mut cursor = ByteCursor::new(data, "MLOD model");
    cursor.expect(b"MLOD").context("not an editable model")?;
    let _version = cursor.u32()?;
    let lods = cursor.count()?;

    let mut found = DependencyList::new();
    for index in 0..lods {
        read_lod(&mut cursor, &mut found).with_context(|| format!("in LOD {index}"))?;
    }
    Ok(found.into_names())
}

fn read_lod(cursor: &mut ByteCursor<'_>, found: &mut DependencyList) -> Result<()> {
    cursor.expect(b"P3DM")?;
    let _major = cursor.u32()?;
    let _minor = cursor.u32()?;
    let points = cursor.count()?;
    let normals = cursor.count()?;
    let faces = cursor.count()?;
    let _flags = cursor.u32()?;

    cursor.skip(points, POINT_SIZE)?;
    cursor.skip(normals, NORMAL_SIZE)?;
    for _ in 0..faces {
        let _sides = cursor.u32()?;
        cursor.skip(4, VERTEX_SIZE)?;
        let _flags = cursor.u32()?;
        found.add(&cursor.asciiz()?);
        found.add(&cursor.asciiz()?);
    }

    cursor.expect(b"TAGG")?;
    loop {
        let _active = cursor.u8()?;
        let name = cursor.asciiz()?;
        let size = cursor.count()?;
        cursor.skip(size, 1)?;
        if name == END_OF_FILE_TAG {
            break;
        }
        if cursor.is_empty() {
            bail!("missing {END_OF_FILE_TAG} tag");
        }
    }
    let _resolution = cursor.f32()?;
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_textures_and_materials_across_lods() {
        let data = fixture::model(&[
            &[
                ("x\\a\\data\\body_co.paa", "x\\a\\data\\body.rvmat"),
                ("#(argb,8,8,3)color(0,0,0,1)", ""),
            ],
            &[("X\\A\\DATA\\BODY_CO.PAA", "x\\a\\data\\glass.rvmat")],
        ]);
        assert_eq!(
            dependencies(&data).unwrap(),
            vec![
                "x\\a\\data\\body_co.paa",
                "x\\a\\data\\body.rvmat",
                "x\\a\\data\\glass.rvmat"
            ]
        );
    }

    #[test]
    fn test_rejects_binarized_model() {
        let err = dependencies(b"ODOL\x31\0\0\0").unwrap_err();
        assert!(format!("{err:#}").contains("not an editable model"));
    }

    #[test]
    fn test_truncated_model() {
        let data = fixture::model(&[&[("a.paa", "b.rvmat")]]);
        let err = dependencies(&data[..data.len() - 10]).unwrap_err();
        assert!(format!("{err:#}").contains("LOD 0"));
    }
}
