//! Departure/arrival station assignment for railway tickets.
//!
//! The ticket layout prints the departure station next to the departure time
//! (`08:12开`). The candidate closest to that anchor line is the departure
//! station and the farthest is the arrival station. This is a layout
//! heuristic, not a semantic check.

/// A station name found in the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationCandidate {
    pub name: String,
    /// Zero-based line index.
    pub line: usize,
    /// Byte offset in the normalized text.
    pub offset: usize,
}

/// Indices into the candidate slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StationAssignment {
    pub departure: Option<usize>,
    pub arrival: Option<usize>,
    /// False when no anchor was available and textual order was used.
    pub anchored: bool,
}

/// Assign departure and arrival among `candidates`.
///
/// Repeated names count once, at the occurrence nearest the anchor (or the
/// first occurrence without an anchor). Ties go to the earlier text for the
/// departure and to the later text for the arrival.
pub fn assign_stations(candidates: &[StationCandidate], anchor_line: Option<usize>) -> StationAssignment {
    let distance = |c: &StationCandidate| anchor_line.map(|a| c.line.abs_diff(a)).unwrap_or(0);

    // One entry per distinct name.
    let mut distinct: Vec<usize> = Vec::new();
    for (i, candidate) in candidates.iter().enumerate() {
        match distinct.iter().position(|&j| candidates[j].name == candidate.name) {
            Some(pos) => {
                if distance(candidate) < distance(&candidates[distinct[pos]]) {
                    distinct[pos] = i;
                }
            }
            None => distinct.push(i),
        }
    }

    let Some(anchor) = anchor_line else {
        let mut by_offset = distinct;
        by_offset.sort_by_key(|&i| candidates[i].offset);
        return StationAssignment {
            departure: by_offset.first().copied(),
            arrival: by_offset.get(1).copied(),
            anchored: false,
        };
    };

    let key = |i: usize| (candidates[i].line.abs_diff(anchor), candidates[i].offset);
    distinct.sort_by_key(|&i| key(i));

    let departure = distinct.first().copied();
    let arrival = distinct.iter().skip(1).copied().max_by_key(|&i| key(i));

    StationAssignment {
        departure,
        arrival,
        anchored: true,
    }
}
