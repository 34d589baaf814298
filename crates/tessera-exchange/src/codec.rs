//! The explicit, versioned, length-prefixed wire format for a tile's
//! communication descriptor plus its physical metadata.
//!
//! Field order matches §6 of the design docs exactly: `owner`, `cid`,
//! `indices`, `top_virtual_owner`, `communications`,
//! `number_of_virtual_neighbors`, `local`, `virtual_owners` (len-prefixed),
//! `types` (len-prefixed), `mins`, `maxs`, `lengths`. This is an explicit
//! byte layout rather than a language-native object-serialization, so it
//! stays stable across workers and across the workspace's own crate
//! versions.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

use tessera_registry::CommDescriptor;
use tessera_traits::{Error, Result};

/// Current wire-format version, written first in every `TILEDATA` message.
/// Bump this whenever the byte layout below changes.
pub const WIRE_VERSION: u8 = 1;

/// Encode a tile's communication descriptor and physical metadata into the
/// `TILEDATA` wire format.
pub fn encode_descriptor<const D: usize>(
    comm: &CommDescriptor<D>,
    lengths: &[u64; D],
    mins: &[f64; D],
    maxs: &[f64; D],
) -> Vec<u8> {
    // Unwraps below write into an in-memory Vec<u8>, which never fails.
    let mut buf = Vec::new();
    buf.write_u8(WIRE_VERSION).unwrap();
    buf.write_i32::<LittleEndian>(comm.owner).unwrap();
    buf.write_u64::<LittleEndian>(comm.cid).unwrap();
    for &i in &comm.indices {
        buf.write_u64::<LittleEndian>(i).unwrap();
    }
    buf.write_i32::<LittleEndian>(comm.top_virtual_owner).unwrap();
    buf.write_u64::<LittleEndian>(comm.communications).unwrap();
    buf.write_u64::<LittleEndian>(comm.number_of_virtual_neighbors)
        .unwrap();
    buf.write_u8(comm.local as u8).unwrap();

    buf.write_u32::<LittleEndian>(comm.virtual_owners.len() as u32)
        .unwrap();
    for &v in &comm.virtual_owners {
        buf.write_i32::<LittleEndian>(v).unwrap();
    }

    buf.write_u32::<LittleEndian>(comm.types.len() as u32).unwrap();
    for &t in &comm.types {
        buf.write_i32::<LittleEndian>(t).unwrap();
    }

    for &m in mins {
        buf.write_f64::<LittleEndian>(m).unwrap();
    }
    for &m in maxs {
        buf.write_f64::<LittleEndian>(m).unwrap();
    }
    for &l in lengths {
        buf.write_u64::<LittleEndian>(l).unwrap();
    }

    buf
}

/// Decode a `TILEDATA` message back into a descriptor plus physical
/// metadata. Fails with [`Error::TransportError`] if the bytes are
/// truncated or carry an unsupported version.
pub fn decode_descriptor<const D: usize>(
    bytes: &[u8],
) -> Result<(CommDescriptor<D>, [u64; D], [f64; D], [f64; D])> {
    let mut cur = Cursor::new(bytes);

    let version = cur.read_u8().map_err(truncated)?;
    if version != WIRE_VERSION {
        return Err(Error::TransportError(format!(
            "unsupported tile descriptor wire version {version}, expected {WIRE_VERSION}"
        )));
    }

    let owner = cur.read_i32::<LittleEndian>().map_err(truncated)?;
    let cid = cur.read_u64::<LittleEndian>().map_err(truncated)?;

    let mut indices = [0u64; D];
    for slot in indices.iter_mut() {
        *slot = cur.read_u64::<LittleEndian>().map_err(truncated)?;
    }

    let top_virtual_owner = cur.read_i32::<LittleEndian>().map_err(truncated)?;
    let communications = cur.read_u64::<LittleEndian>().map_err(truncated)?;
    let number_of_virtual_neighbors = cur.read_u64::<LittleEndian>().map_err(truncated)?;
    let local = cur.read_u8().map_err(truncated)? != 0;

    let n_virtual = cur.read_u32::<LittleEndian>().map_err(truncated)?;
    let mut virtual_owners = Vec::with_capacity(n_virtual as usize);
    for _ in 0..n_virtual {
        virtual_owners.push(cur.read_i32::<LittleEndian>().map_err(truncated)?);
    }

    let n_types = cur.read_u32::<LittleEndian>().map_err(truncated)?;
    let mut types = Vec::with_capacity(n_types as usize);
    for _ in 0..n_types {
        types.push(cur.read_i32::<LittleEndian>().map_err(truncated)?);
    }

    let mut mins = [0.0f64; D];
    for slot in mins.iter_mut() {
        *slot = cur.read_f64::<LittleEndian>().map_err(truncated)?;
    }
    let mut maxs = [0.0f64; D];
    for slot in maxs.iter_mut() {
        *slot = cur.read_f64::<LittleEndian>().map_err(truncated)?;
    }
    let mut lengths = [0u64; D];
    for slot in lengths.iter_mut() {
        *slot = cur.read_u64::<LittleEndian>().map_err(truncated)?;
    }

    let comm = CommDescriptor {
        owner,
        cid,
        indices,
        local,
        top_virtual_owner,
        communications,
        number_of_virtual_neighbors,
        virtual_owners,
        types,
    };
    Ok((comm, lengths, mins, maxs))
}

fn truncated(e: std::io::Error) -> Error {
    Error::TransportError(format!("malformed tile descriptor on the wire: {e}"))
}
