//! Removal of redundant contour vertices.

use crate::vertex::Vertex;

/// Two unit edges count as parallel when their dot product is within this of ±1.
pub const DIRECTION_TOLERANCE: f64 = 1.0e-6;

/// Simplify a closed ring.
///
/// Repeatedly drops vertices equal to their successor, then vertices whose
/// incoming and outgoing edges run in the same direction (collinear) or in
/// opposite directions (spikes), until nothing changes. Returns `None` if no
/// vertices survive.
pub fn simplify_ring(ring: &[Vertex]) -> Option<Vec<Vertex>> {
    let mut current: Vec<Vertex> = ring.to_vec();

    loop {
        let before = current.len();
        current = remove_repeated(current);
        current = remove_straight(current);
        if current.is_empty() {
            return None;
        }
        if current.len() == before {
            return Some(current);
        }
    }
}

fn remove_repeated(mut ring: Vec<Vertex>) -> Vec<Vertex> {
    loop {
        let n = ring.len();
        if n < 2 {
            return ring;
        }
        let keep: Vec<bool> = (0..n).map(|i| ring[i] != ring[(i + 1) % n]).collect();
        if keep.iter().all(|&k| k) {
            return ring;
        }
        if keep.iter().all(|&k| !k) {
            // Every vertex is the same point
            ring.truncate(1);
            return ring;
        }
        ring = retain_flags(&ring, &keep);
    }
}

fn remove_straight(ring: Vec<Vertex>) -> Vec<Vertex> {
    let n = ring.len();
    if n < 2 {
        return ring;
    }

    let edges: Vec<Option<Vertex>> = (0..n)
        .map(|i| (ring[(i + 1) % n] - ring[i]).normalized())
        .collect();

    let keep: Vec<bool> = (0..n)
        .map(|i| {
            let incoming = edges[(i + n - 1) % n];
            let outgoing = edges[i];
            match (incoming, outgoing) {
                (Some(a), Some(b)) => {
                    let cos = a.dot(b);
                    cos <= 1.0 - DIRECTION_TOLERANCE && cos >= -1.0 + DIRECTION_TOLERANCE
                }
                _ => true,
            }
        })
        .collect();

    retain_flags(&ring, &keep)
}

fn retain_flags(ring: &[Vertex], keep: &[bool]) -> Vec<Vertex> {
    ring.iter()
        .zip(keep)
        .filter_map(|(v, &k)| k.then_some(*v))
        .collect()
}
