//! Hierarchical layout engine.
//!
//! Containers are sized bottom-up: every container is laid out after all of
//! its descendants, so child sizes are final when the parent places them.
//! Resource children are stacked in tier rows, sub-containers in a public and
//! a private row, and the top-level enclosure gets a fixup pass for its entry
//! node and for external root nodes.

use super::LayoutError;
use super::config::LayoutConfig;
use super::tiers::{Tier, is_entry_point};
use crate::graph::ContainmentTree;
use crate::models::{DiagramEdge, DiagramNode, Position, Size, SubnetRole};
use tracing::debug;

/// Compute positions and container sizes for a diagram.
///
/// Returns new nodes in input order; the input is never mutated. Edges do not
/// influence geometry. Running the result through the engine again yields
/// identical geometry.
pub fn compute_layout(
    nodes: &[DiagramNode],
    _edges: &[DiagramEdge],
    config: &LayoutConfig,
) -> Result<Vec<DiagramNode>, LayoutError> {
    let cfg = config.normalized();
    let tree = ContainmentTree::build(nodes)?;

    let mut out = nodes.to_vec();
    let default_size = cfg.default_resource_size();
    for node in out.iter_mut() {
        node.position = clamp_position(node.position);
        if !node.is_container() {
            node.size = node.size.or_default(default_size);
        }
    }

    let primary = tree.roots.iter().copied().find(|i| out[*i].is_container());
    let mut entry = None;

    for idx in tree.post_order() {
        if !out[idx].is_container() {
            continue;
        }
        let is_primary = primary == Some(idx);
        let placed_entry = layout_container(&mut out, idx, &tree.children[idx], is_primary, &cfg);
        if is_primary {
            entry = placed_entry;
        }
    }

    if let (Some(primary), Some(entry)) = (primary, entry) {
        let enclosure_width = out[primary].size.width;
        let entry_node = &mut out[entry];
        entry_node.position.x = ((enclosure_width - entry_node.size.width) / 2.0).max(0.0);
    }

    place_roots(&mut out, &tree.roots, &cfg);

    debug!(
        "Laid out {} nodes ({} roots, entry node: {:?})",
        out.len(),
        tree.roots.len(),
        entry.map(|i| out[i].id.as_str())
    );
    Ok(out)
}

fn clamp_position(position: Position) -> Position {
    let clamp = |v: f64| if v.is_finite() { v.max(0.0) } else { 0.0 };
    Position::new(clamp(position.x), clamp(position.y))
}

/// Lay out the direct children of one container and size it.
///
/// Returns the entry node index when one was given its own row.
fn layout_container(
    out: &mut [DiagramNode],
    idx: usize,
    children: &[usize],
    allow_entry: bool,
    cfg: &LayoutConfig,
) -> Option<usize> {
    let padding = cfg.padding;
    let margin = cfg.exclusive_margin;

    let resources: Vec<usize> = children
        .iter()
        .copied()
        .filter(|c| !out[*c].is_container())
        .collect();
    let containers: Vec<usize> = children
        .iter()
        .copied()
        .filter(|c| out[*c].is_container())
        .collect();

    let entry = if allow_entry {
        resources.iter().copied().find(|c| {
            let attributes = &out[*c].attributes;
            Tier::of(attributes) == Tier::Edge && is_entry_point(&attributes.service_kind)
        })
    } else {
        None
    };

    // Tier rows; the entry node owns the first row on its own
    let mut rows: Vec<(Option<Tier>, Vec<usize>)> = Vec::new();
    if let Some(entry) = entry {
        rows.push((None, vec![entry]));
    }
    let mut tiered: Vec<(Tier, usize)> = resources
        .iter()
        .copied()
        .filter(|c| Some(*c) != entry)
        .map(|c| (Tier::of(&out[c].attributes), c))
        .collect();
    tiered.sort_by_key(|(tier, _)| *tier);
    for (tier, child) in tiered {
        match rows.last_mut() {
            Some((Some(row_tier), row)) if *row_tier == tier => row.push(child),
            _ => rows.push((Some(tier), vec![child])),
        }
    }

    let slot_width = resources
        .iter()
        .map(|c| out[*c].size.width)
        .fold(0.0, f64::max)
        + margin;
    let widest_row = rows.iter().map(|(_, row)| row.len()).max().unwrap_or(0);
    let tier_block_width = widest_row as f64 * slot_width;
    let row_heights: Vec<f64> = rows
        .iter()
        .map(|(_, row)| row.iter().map(|c| out[*c].size.height).fold(0.0, f64::max) + margin)
        .collect();
    let tier_block_height: f64 = row_heights.iter().sum();

    // Container rows: public first, everything else in the second row
    let (public, private): (Vec<usize>, Vec<usize>) = containers
        .iter()
        .copied()
        .partition(|c| out[*c].attributes.subnet_role == Some(SubnetRole::Public));
    let container_rows: Vec<Vec<usize>> = [public, private]
        .into_iter()
        .filter(|row| !row.is_empty())
        .collect();

    let mut container_row_heights = Vec::with_capacity(container_rows.len());
    let mut container_block_width: f64 = 0.0;
    for row in &container_rows {
        let row_height = row.iter().map(|c| out[*c].size.height).fold(0.0, f64::max);
        for child in row {
            out[*child].size.height = row_height;
        }
        let widths: f64 = row.iter().map(|c| out[*c].size.width).sum();
        let row_width = widths + cfg.container_gap * (row.len() - 1) as f64 + margin;
        container_block_width = container_block_width.max(row_width);
        container_row_heights.push(row_height);
    }
    let container_block_height = if container_rows.is_empty() {
        0.0
    } else {
        margin
            + container_row_heights.iter().sum::<f64>()
            + cfg.row_gap * (container_rows.len() - 1) as f64
    };

    let block_gap = if !rows.is_empty() && !container_rows.is_empty() {
        cfg.row_gap
    } else {
        0.0
    };

    let content_width = tier_block_width.max(container_block_width);
    let width = (2.0 * padding + content_width).max(cfg.min_container_width);
    let height = (cfg.header_height
        + 2.0 * padding
        + tier_block_height
        + block_gap
        + container_block_height)
        .max(cfg.min_container_height);

    // Each tier row is centered as a group; children centered in their slot
    let inner_width = width - 2.0 * padding;
    let mut y = cfg.header_height + padding;
    for ((_, row), row_height) in rows.iter().zip(&row_heights) {
        let group_width = row.len() as f64 * slot_width;
        let row_x = padding + (inner_width - group_width) / 2.0;
        for (slot, child) in row.iter().enumerate() {
            let size = out[*child].size;
            out[*child].position = Position::new(
                row_x + slot as f64 * slot_width + (slot_width - size.width) / 2.0,
                y + (row_height - size.height) / 2.0,
            );
        }
        y += row_height;
    }

    let mut row_y = y + block_gap + margin / 2.0;
    for (row, row_height) in container_rows.iter().zip(&container_row_heights) {
        let mut x = padding + margin / 2.0;
        for child in row {
            out[*child].position = Position::new(x, row_y);
            x += out[*child].size.width + cfg.container_gap;
        }
        row_y += row_height + cfg.row_gap;
    }

    out[idx].size = Size::new(width, height);
    entry
}

/// Place root containers side by side and stack external root resources.
///
/// A root resource is external when it starts at or past the enclosure's
/// right edge, or when its padded box overlaps the enclosure. Root resources
/// left of, above or below the enclosure keep their position.
fn place_roots(out: &mut [DiagramNode], roots: &[usize], cfg: &LayoutConfig) {
    let containers: Vec<usize> = roots
        .iter()
        .copied()
        .filter(|r| out[*r].is_container())
        .collect();
    let Some(&first) = containers.first() else {
        return;
    };

    let anchor = out[first].position;
    let mut x = anchor.x;
    for container in &containers {
        out[*container].position = Position::new(x, anchor.y);
        x += out[*container].size.width + cfg.container_gap;
    }
    let enclosure_right = x - cfg.container_gap;
    let enclosure_bottom = containers
        .iter()
        .map(|c| anchor.y + out[*c].size.height)
        .fold(anchor.y, f64::max);

    let margin = cfg.exclusive_margin;
    let mut externals: Vec<usize> = roots
        .iter()
        .copied()
        .filter(|r| {
            let node = &out[*r];
            if node.is_container() {
                return false;
            }
            let (left, top) = (node.position.x, node.position.y);
            let (right, bottom) = (left + node.size.width, top + node.size.height);
            let overlaps = right + margin > anchor.x
                && left < enclosure_right + margin
                && bottom + margin > anchor.y
                && top < enclosure_bottom + margin;
            left >= enclosure_right || overlaps
        })
        .collect();
    externals.sort_by(|a, b| out[*a].position.y.total_cmp(&out[*b].position.y));

    let mut y = anchor.y;
    for external in externals {
        out[external].position = Position::new(enclosure_right + cfg.external_gap, y);
        y += out[external].size.height + cfg.external_gap;
    }
}
