//! Density-based clustering (DBSCAN) over cosine distance.

use digest_vector::{cosine_distance, VectorError};

/// Label each point with a cluster id, or `None` for noise.
///
/// A point's neighbourhood is every point (itself included) within `eps`
/// cosine distance; a point is a core point when its neighbourhood holds at
/// least `min_samples` points. Clusters grow from core points in index
/// order, so ids are assigned deterministically and a border point reachable
/// from two clusters joins the one discovered first.
pub fn dbscan(
    points: &[&[f32]],
    eps: f64,
    min_samples: usize,
) -> Result<Vec<Option<usize>>, VectorError> {
    let neighborhoods = neighborhoods(points, eps)?;
    let is_core: Vec<bool> = neighborhoods
        .iter()
        .map(|n| n.len() >= min_samples)
        .collect();

    let mut labels: Vec<Option<usize>> = vec![None; points.len()];
    let mut next_id = 0;
    let mut stack: Vec<usize> = Vec::new();

    for start in 0..points.len() {
        if labels[start].is_some() || !is_core[start] {
            continue;
        }
        stack.push(start);
        while let Some(i) = stack.pop() {
            if labels[i].is_some() {
                continue;
            }
            labels[i] = Some(next_id);
            if is_core[i] {
                stack.extend(
                    neighborhoods[i]
                        .iter()
                        .copied()
                        .filter(|&j| labels[j].is_none()),
                );
            }
        }
        next_id += 1;
    }

    Ok(labels)
}

fn neighborhoods(points: &[&[f32]], eps: f64) -> Result<Vec<Vec<usize>>, VectorError> {
    let n = points.len();
    let mut result: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();
    for i in 0..n {
        for j in (i + 1)..n {
            if cosine_distance(points[i], points[j])? <= eps {
                result[i].push(j);
                result[j].push(i);
            }
        }
    }
    Ok(result)
}
