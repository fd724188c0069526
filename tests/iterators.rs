use kdneighbors::{random_points_with, BoundingBox, Error, KdTree};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn cloud(seed: u64, n: usize) -> Vec<[f64; 3]> {
    let bounds = BoundingBox::new([0.0; 3], [10.0; 3]);
    random_points_with(&mut StdRng::seed_from_u64(seed), n, &bounds).unwrap()
}

fn dist_sq(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    (0..3).map(|i| (a[i] - b[i]) * (a[i] - b[i])).sum()
}

#[test]
fn test_has_next_advance_loop() {
    let points = cloud(1, 500);
    let tree = KdTree::build(&points, 8).unwrap();
    let q = [5.0, 5.0, 5.0];

    let mut it = tree.range_query(&q, 2.5).unwrap();
    let mut count = 0;
    while it.has_next() {
        let idx = it.advance().unwrap();
        assert!(dist_sq(&points[idx], &q) <= 2.5 * 2.5);
        count += 1;
    }
    assert_eq!(count, tree.range_query(&q, 2.5).unwrap().count());

    // Exhausted is terminal
    for _ in 0..3 {
        assert!(!it.has_next());
        assert_eq!(it.advance(), Err(Error::ExhaustedIterator));
        assert_eq!(it.next(), None);
    }
}

#[test]
fn test_loop_until_end_sentinel() {
    let points = cloud(2, 300);
    let tree = KdTree::build(&points, 4).unwrap();
    let q = [3.0, 7.0, 1.0];

    let mut it = tree.knn_query(&q, 10).unwrap();
    let end = it.end();
    let mut out = Vec::new();
    while it != end {
        out.push(it.advance().unwrap());
    }
    assert_eq!(out, tree.knn_query(&q, 10).unwrap().collect::<Vec<_>>());
}

#[test]
fn test_loop_until_end_sentinel_on_empty_results() {
    let points = vec![[0.0, 0.0], [1.0, 1.0]];
    let tree = KdTree::build(&points, 1).unwrap();

    // Query ball misses the root box entirely
    let mut it = tree.range_query(&[50.0, 50.0], 1.0).unwrap();
    let end = it.end();
    while it != end {
        it.advance().unwrap();
    }
    assert!(!it.has_next());

    // Ball overlaps the root box but holds no point
    let mut it = tree.range_query(&[0.5, 0.5], 0.1).unwrap();
    let end = it.end();
    while it != end {
        it.advance().unwrap();
    }
    assert!(!it.has_next());

    let lonely = vec![[3.0, 3.0]];
    let tree = KdTree::build(&lonely, 4).unwrap();
    let mut it = tree.knn_index_query(0, 5).unwrap();
    let end = it.end();
    while it != end {
        it.advance().unwrap();
    }
    assert_eq!(it.next(), None);

    let none: Vec<[f64; 2]> = Vec::new();
    let tree = KdTree::build(&none, 4).unwrap();
    let it = tree.knn_query(&[0.0, 0.0], 3).unwrap();
    assert!(it == it.end());
    let it = tree.range_query(&[0.0, 0.0], 3.0).unwrap();
    assert!(it == it.end());
}

#[test]
fn test_comparing_against_end_does_not_consume() {
    let points = cloud(9, 300);
    let tree = KdTree::build(&points, 8).unwrap();
    let q = [5.0; 3];

    let mut it = tree.range_query(&q, 3.0).unwrap();
    let end = it.end();
    assert!(it != end);
    assert!(it != end);
    let mut out = Vec::new();
    while it != end {
        out.push(it.advance().unwrap());
    }
    assert_eq!(out, tree.range_query(&q, 3.0).unwrap().collect::<Vec<_>>());
    assert!(!out.is_empty());
}

#[test]
fn test_drained_iterators_compare_equal() {
    let points = cloud(3, 200);
    let tree = KdTree::build(&points, 8).unwrap();
    let q = [1.0, 1.0, 1.0];

    let mut a = tree.range_query(&q, 3.0).unwrap();
    let mut b = tree.range_query(&q, 3.0).unwrap();
    a.by_ref().for_each(drop);
    b.by_ref().for_each(drop);
    assert!(a.is_exhausted() && b.is_exhausted());
    assert!(a == b);
    assert!(a == a.end());

    let mut c = tree.knn_query(&q, 4).unwrap();
    let mut d = tree.knn_query(&q, 4).unwrap();
    assert_eq!(c.by_ref().count(), 4);
    assert_eq!(d.by_ref().count(), 4);
    assert!(c == d);

    // Different queries never compare equal, even when both are drained
    let mut e = tree.knn_query(&q, 5).unwrap();
    e.by_ref().for_each(drop);
    assert!(e.is_exhausted());
    let other = tree.knn_query(&q, 4).unwrap().end();
    assert!(e.end() != other);
}

#[test]
fn test_iterators_on_different_trees_differ() {
    let points = cloud(4, 50);
    let t1 = KdTree::build(&points, 8).unwrap();
    let t2 = KdTree::build(&points, 8).unwrap();
    let q = [0.0; 3];
    assert!(t1.range_query(&q, 1.0).unwrap() != t2.range_query(&q, 1.0).unwrap());
}

#[test]
fn test_knn_results_ascend() {
    let points = cloud(5, 1000);
    let tree = KdTree::build(&points, 16).unwrap();
    let q = [2.0, 9.0, 4.5];

    let knn: Vec<usize> = tree.knn_query(&q, 50).unwrap().collect();
    assert_eq!(knn.len(), 50);
    for w in knn.windows(2) {
        let (d0, d1) = (dist_sq(&points[w[0]], &q), dist_sq(&points[w[1]], &q));
        assert!(d0 < d1 || (d0 == d1 && w[0] < w[1]), "results out of order: {:?}", w);
    }
}

#[test]
fn test_early_exit_consumer() {
    let points = cloud(6, 2000);
    let tree = KdTree::build(&points, 16).unwrap();
    let q = [5.0; 3];

    // Stop after the first three hits, as a fitting loop with enough samples would
    let first: Vec<usize> = tree.range_query(&q, 4.0).unwrap().take(3).collect();
    assert_eq!(first.len(), 3);
    let all: Vec<usize> = tree.range_query(&q, 4.0).unwrap().collect();
    assert_eq!(&all[..3], &first[..]);
}

#[test]
fn test_not_restartable() {
    let points = cloud(7, 100);
    let tree = KdTree::build(&points, 8).unwrap();
    let mut it = tree.knn_query(&[5.0; 3], 3).unwrap();
    let first: Vec<usize> = it.by_ref().collect();
    assert_eq!(first.len(), 3);
    let second: Vec<usize> = it.by_ref().collect();
    assert!(second.is_empty());

    // A fresh query enumerates again
    let again: Vec<usize> = tree.knn_query(&[5.0; 3], 3).unwrap().collect();
    assert_eq!(first, again);
}

#[test]
fn test_nearest_query_yields_one() {
    let points = cloud(8, 100);
    let tree = KdTree::build(&points, 8).unwrap();
    let q = [9.0, 0.5, 3.0];
    let mut it = tree.nearest_query(&q);
    let idx = it.advance().unwrap();
    assert_eq!(Some(idx), tree.nearest(&q));
    assert!(!it.has_next());
    assert!(it.is_exhausted());
}
