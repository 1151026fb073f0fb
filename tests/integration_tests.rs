use std::time::{Duration, Instant};
use trailmark::{
    ClusterConfig, GeoPoint, IndexRegistry, TrackConfig, UpdateCoalescer, Viewport, project,
    track_segments,
};

fn item(id: &str, lat: f64, lon: f64, group: &str, ts: i64) -> GeoPoint {
    GeoPoint::new(id, lat, lon, group).with_timestamp(ts)
}

fn world(zoom: f64) -> Viewport {
    Viewport::new(-180.0, -90.0, 180.0, 90.0, zoom)
}

#[test]
fn test_point_conservation_across_groups_and_zooms() {
    let mut registry = IndexRegistry::new(ClusterConfig::default()).unwrap();

    let mut items = Vec::new();
    for i in 0..30 {
        items.push(item(
            &format!("a{:02}", i),
            40.0 + (i as f64) * 0.002,
            -74.0 + (i as f64) * 0.002,
            "trip-a",
            i,
        ));
    }
    for i in 0..20 {
        items.push(item(
            &format!("b{:02}", i),
            48.0 + (i as f64) * 0.5,
            2.0 + (i as f64) * 0.5,
            "trip-b",
            i,
        ));
    }
    registry.rebuild(items).unwrap();

    for zoom in 0..=20 {
        let records = project(&registry, &world(zoom as f64));
        let total: usize = records.iter().map(|r| r.count).sum();
        assert_eq!(total, 50, "point count lost or duplicated at zoom {}", zoom);
    }
}

#[test]
fn test_every_cluster_meets_min_points() {
    let config = ClusterConfig::default().with_min_points(4);
    let mut registry = IndexRegistry::new(config).unwrap();
    let items: Vec<GeoPoint> = (0..25)
        .map(|i| {
            item(
                &format!("p{:02}", i),
                ((i * 3) % 10) as f64 * 0.001,
                ((i * 7) % 10) as f64 * 0.001,
                "trip",
                i,
            )
        })
        .collect();
    registry.rebuild(items).unwrap();

    for zoom in 0..=20 {
        for record in project(&registry, &world(zoom as f64)) {
            if record.is_cluster {
                assert!(record.count >= 4, "undersized cluster at zoom {}", zoom);
            } else {
                assert_eq!(record.count, 1);
            }
        }
    }
}

#[test]
fn test_leaves_roundtrip_through_composite_id() {
    let mut registry = IndexRegistry::new(ClusterConfig::default()).unwrap();
    registry
        .rebuild(vec![
            item("p1", 0.0, 0.0, "trip", 1),
            item("p2", 0.0001, 0.0001, "trip", 2),
            item("p3", 0.0002, 0.0002, "trip", 3),
        ])
        .unwrap();

    let records = project(&registry, &world(3.0));
    assert_eq!(records.len(), 1);
    let cluster = &records[0];
    assert!(cluster.is_cluster);
    assert_eq!(cluster.count, 3);

    let mut ids: Vec<String> = trailmark::leaves(&registry, &cluster.composite_id, 50)
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, vec!["p1", "p2", "p3"]);
}

#[test]
fn test_marker_count_monotonic_in_zoom() {
    let mut registry = IndexRegistry::new(ClusterConfig::default()).unwrap();
    let items: Vec<GeoPoint> = (0..60)
        .map(|i| {
            item(
                &format!("p{:02}", i),
                ((i * 11) % 37) as f64 - 18.0,
                ((i * 17) % 73) as f64 - 36.0,
                "trip",
                i,
            )
        })
        .collect();
    registry.rebuild(items).unwrap();

    let mut previous = 0;
    for zoom in 0..=20 {
        let count = project(&registry, &world(zoom as f64)).len();
        assert!(
            count >= previous,
            "marker count fell from {} to {} at zoom {}",
            previous,
            count,
            zoom
        );
        previous = count;
    }
}

#[test]
fn test_coincident_groups_never_share_a_cluster() {
    let mut registry = IndexRegistry::new(ClusterConfig::default()).unwrap();
    registry
        .rebuild(vec![
            item("a1", 35.6895, 139.6917, "tokyo-2024", 1),
            item("a2", 35.6895, 139.6917, "tokyo-2024", 2),
            item("b1", 35.6895, 139.6917, "tokyo-2025", 1),
            item("b2", 35.6895, 139.6917, "tokyo-2025", 2),
        ])
        .unwrap();

    let records = project(&registry, &world(2.0));
    assert_eq!(records.len(), 2);

    let mut owners: Vec<&str> = records
        .iter()
        .map(|r| trailmark::split_composite_id(&r.composite_id).unwrap().0)
        .collect();
    owners.sort_unstable();
    assert_eq!(owners, vec!["tokyo-2024", "tokyo-2025"]);
}

#[test]
fn test_debounced_projection_uses_last_input() {
    let mut registry = IndexRegistry::new(ClusterConfig::default()).unwrap();
    registry
        .rebuild(vec![
            item("p1", 0.0, 0.0, "trip", 1),
            item("p2", 0.0001, 0.0, "trip", 2),
        ])
        .unwrap();

    let mut coalescer = UpdateCoalescer::new(Duration::from_millis(200));
    let t0 = Instant::now();

    coalescer.notify(world(1.0), t0);
    coalescer.notify(world(2.0), t0 + Duration::from_millis(50));
    coalescer.notify(world(3.0), t0 + Duration::from_millis(100));
    coalescer.notify(world(20.0), t0 + Duration::from_millis(140));

    let mut projections = 0;
    let mut last_len = 0;
    for elapsed in [150u64, 200, 300, 339, 340, 400, 600] {
        if let Some(records) = coalescer.run_due(t0 + Duration::from_millis(elapsed), |v| {
            Ok(project(&registry, v))
        }) {
            projections += 1;
            last_len = records.len();
        }
    }

    // Exactly one projection, from the final (zoom 20) input: both photos
    // draw individually there, whereas the earlier zooms would have merged
    // them.
    assert_eq!(projections, 1);
    assert_eq!(last_len, 2);
}

#[test]
fn test_track_full_resolution_and_collapsed() {
    let items = vec![
        item("p1", 0.0, 0.0, "trip", 100),
        item("p2", 0.001, 0.001, "trip", 200),
        item("p3", 0.002, 0.002, "trip", 300),
        item("p4", 0.003, 0.003, "trip", 400),
        item("p5", 0.004, 0.004, "trip", 500),
    ];

    // At zoom 15 the path is one-to-one and chronological.
    let segments = track_segments(&items, 15.0, &TrackConfig::default());
    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].coordinates.len(), 5);
    assert_eq!(segments[0].coordinates[0], (0.0, 0.0));
    assert_eq!(segments[0].coordinates[4], (0.004, 0.004));

    // At zoom 3 with a threshold wide enough to merge everything, the path
    // collapses to a single vertex and is dropped outright.
    let config = TrackConfig::default().with_proximity_deg(1.0);
    assert!(track_segments(&items, 3.0, &config).is_empty());
}

#[test]
fn test_membership_change_then_reprojection() {
    let mut registry = IndexRegistry::new(ClusterConfig::default()).unwrap();
    registry
        .rebuild(vec![
            item("p1", 10.0, 10.0, "trip", 1),
            item("p2", 10.0001, 10.0, "trip", 2),
        ])
        .unwrap();

    let before = project(&registry, &world(5.0));
    assert_eq!(before.len(), 1);
    assert!(before[0].is_cluster);
    let stale_id = before[0].composite_id.clone();

    // One photo leaves the trip: the index is rebuilt wholesale and the old
    // cluster id no longer resolves.
    registry
        .rebuild(vec![item("p1", 10.0, 10.0, "trip", 1)])
        .unwrap();

    let after = project(&registry, &world(5.0));
    assert_eq!(after.len(), 1);
    assert!(!after[0].is_cluster);
    assert_eq!(after[0].composite_id, "p1");

    // Stale composite ids are recoverable errors, never panics.
    assert!(trailmark::expansion_zoom(&registry, &stale_id).is_err());
}

#[test]
fn test_unlocatable_items_never_reach_output() {
    let mut registry = IndexRegistry::new(ClusterConfig::default()).unwrap();

    let items: Vec<GeoPoint> = vec![
        GeoPoint::with_location("ok", Some(10.0), Some(10.0), "trip", Some(1)),
        GeoPoint::with_location("no-lat", None, Some(10.0), "trip", Some(2)),
        GeoPoint::with_location("no-lon", Some(10.0), None, "trip", Some(3)),
    ]
    .into_iter()
    .flatten()
    .collect();

    assert_eq!(items.len(), 1);
    registry.rebuild(items).unwrap();

    let records = project(&registry, &world(10.0));
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].composite_id, "ok");
}

#[test]
fn test_drill_down_via_expansion_zoom() {
    let mut registry = IndexRegistry::new(ClusterConfig::default()).unwrap();
    registry
        .rebuild(vec![
            item("p1", 45.0, 7.0, "trip", 1),
            item("p2", 45.01, 7.01, "trip", 2),
            item("p3", 46.0, 8.0, "trip", 3),
        ])
        .unwrap();

    // Walk down from zoom 0 following expansion zooms until everything is
    // an individual marker; must terminate and never lose points.
    let mut zoom = 0.0;
    loop {
        let records = project(&registry, &world(zoom));
        let total: usize = records.iter().map(|r| r.count).sum();
        assert_eq!(total, 3);

        match records.iter().find(|r| r.is_cluster) {
            Some(cluster) => {
                let next = trailmark::expansion_zoom(&registry, &cluster.composite_id).unwrap();
                let next = (next as f64).min(20.0);
                assert!(next > zoom, "expansion zoom must move forward");
                zoom = next;
            }
            None => {
                assert_eq!(records.len(), 3);
                break;
            }
        }
    }
}
