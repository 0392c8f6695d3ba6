//! Material and object model names of 8WVR terrains.

use anyhow::{Context, Result, bail};

use super::DependencyList;
use super::cursor::ByteCursor;

/// Size of an object record's transform, 12 `f32`s.
const TRANSFORM_SIZE: usize = 48;

/// Materials and models referenced by an 8WVR terrain, in file order.
///
/// Layout after the `"8WVR"` signature: texture grid size (x, z), terrain
/// grid size (x, z), cell size, `terrain²` elevations (`f32`), `texture²`
/// material indices (`u16`), the material count, an empty first material, the
/// remaining materials as length-prefixed names each followed by a zero
/// `u32`, and finally object records until one has an empty name.
pub fn dependencies(data: &[u8]) -> Result<Vec<String>> {
    let mut cursor = ByteCursor::new(data, "8WVR terrain");
    cursor.expect(b"8WVR").context("unsupported terrain format")?;

    let texture_grid = grid(cursor.i32()?, cursor.i32()?)?;
    let terrain_grid = grid(cursor.i32()?, cursor.i32()?)?;
    let _cell_size = cursor.f32()?;

    cursor.skip(terrain_grid, 4).context("reading elevations")?;
    cursor.skip(texture_grid, 2).context("reading material indices")?;

    let mut found = DependencyList::new();
    let materials = cursor.i32()?;
    let first = cursor.u32()?;
    if first != 0 {
        bail!("first terrain material must be empty, found length {first}");
    }
    for index in 1..materials.max(1) {
        let len = cursor.count()?;
        if len == 0 {
            bail!("terrain material {index} has no name");
        }
        let name = cursor.bytes(len)?;
        found.add(&String::from_utf8_lossy(name));
        if cursor.u32()? != 0 {
            bail!("terrain material {index} is not followed by a zero length");
        }
    }

    loop {
        cursor.skip(1, TRANSFORM_SIZE).context("reading objects")?;
        let _object_index = cursor.u32()?;
        let len = cursor.count()?;
        if len == 0 {
            break;
        }
        let name = cursor.bytes(len)?;
        found.add(&String::from_utf8_lossy(name));
    }

    Ok(found.into_names())
}

/// Number of cells of a square grid.
fn grid(x: i32, z: i32) -> Result<usize> {
    if x < 0 || z < 0 || x != z {
        bail!("unsupported grid size {x}x{z}");
    }
    let side = x as usize;
    side.checked_mul(side).context("grid too large")
}
