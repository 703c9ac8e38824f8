//! Marching-squares iso-contours of a boolean mask.
//!
//! Contours follow the 0.5 level between set and unset pixel centres, so every
//! vertex sits on a pixel centre line or halfway between two centres. The mask
//! is padded with one unset pixel on each side, which closes every contour.
//! At saddle cells the unset pixels are treated as connected.

use std::collections::HashMap;

use crate::mask::{Mask, pad};
use crate::vertex::Vertex;

/// Grid position in doubled coordinates of the padded mask.
type Key = (i64, i64);

/// Extract closed iso-contours, one ring per connected boundary.
///
/// Rings are returned in the order their first segment is met scanning cells
/// row by row. Vertices are in original `(x, y)` image coordinates and are not
/// simplified.
pub fn marching_squares(mask: &Mask) -> Vec<Vec<Vertex>> {
    let padded = pad(mask, 1);
    let (h, w) = padded.dim();
    if h < 2 || w < 2 {
        return Vec::new();
    }

    let mut order: Vec<Key> = Vec::new();
    let mut next: HashMap<Key, Key> = HashMap::new();

    for cy in 0..h - 1 {
        for cx in 0..w - 1 {
            for (start, end) in cell_segments(&padded, cx, cy) {
                order.push(start);
                next.insert(start, end);
            }
        }
    }

    let mut rings = Vec::new();
    for start in order {
        let Some(mut cursor) = next.remove(&start) else {
            continue;
        };
        let mut ring = vec![key_to_vertex(start)];
        while cursor != start {
            ring.push(key_to_vertex(cursor));
            match next.remove(&cursor) {
                Some(following) => cursor = following,
                None => {
                    log::warn!("Open marching-squares chain at {:?}", cursor);
                    break;
                }
            }
        }
        rings.push(ring);
    }

    log::trace!("Marching squares found {} contours", rings.len());
    rings
}

/// Directed segments crossing one cell.
///
/// Corners are visited clockwise (top-left, top-right, bottom-right,
/// bottom-left). Each segment runs from an unset-to-set crossing to the next
/// set-to-unset crossing, cutting off the set corners between them.
fn cell_segments(padded: &Mask, cx: usize, cy: usize) -> Vec<(Key, Key)> {
    let corners = [
        padded[[cy, cx]],
        padded[[cy, cx + 1]],
        padded[[cy + 1, cx + 1]],
        padded[[cy + 1, cx]],
    ];
    let (x, y) = (cx as i64 * 2, cy as i64 * 2);
    // Midpoints of the edges leaving each corner, in clockwise order
    let midpoints = [(x + 1, y), (x + 2, y + 1), (x + 1, y + 2), (x, y + 1)];

    let mut entries = Vec::with_capacity(2);
    let mut exits = Vec::with_capacity(2);
    for i in 0..4 {
        let (a, b) = (corners[i], corners[(i + 1) % 4]);
        if !a && b {
            entries.push(i);
        } else if a && !b {
            exits.push(i);
        }
    }

    entries
        .into_iter()
        .filter_map(|entry| {
            let exit = (1..=4)
                .map(|step| (entry + step) % 4)
                .find(|i| exits.contains(i))?;
            Some((midpoints[entry], midpoints[exit]))
        })
        .collect()
}

fn key_to_vertex((kx, ky): Key) -> Vertex {
    Vertex::new(kx as f64 * 0.5 - 1.0, ky as f64 * 0.5 - 1.0)
}
