use std::time::{Duration, Instant};
use trailmark::{
    ClusterConfig, GeoPoint, IndexRegistry, TrackConfig, UpdateCoalescer, Viewport, project,
    track_segments,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (set RUST_LOG=debug to see detailed logs)
    env_logger::init();

    println!("=== Trailmark - Getting Started ===\n");

    // === BUILDING A REGISTRY ===
    println!("1. Indexing Two Trips");
    println!("---------------------");

    let mut registry = IndexRegistry::new(ClusterConfig::default())?;

    let items = vec![
        GeoPoint::new("louvre", 48.8606, 2.3376, "paris-2025").with_timestamp(1750000000000),
        GeoPoint::new("orsay", 48.8600, 2.3266, "paris-2025").with_timestamp(1750003600000),
        GeoPoint::new("eiffel", 48.8584, 2.2945, "paris-2025").with_timestamp(1750007200000),
        GeoPoint::new("versailles", 48.8049, 2.1204, "paris-2025").with_timestamp(1750093600000),
        GeoPoint::new("shibuya", 35.6595, 139.7005, "tokyo-2024").with_timestamp(1700000000000),
        GeoPoint::new("asakusa", 35.7148, 139.7967, "tokyo-2024").with_timestamp(1700003600000),
    ];
    registry.rebuild(items.clone())?;

    let stats = registry.stats();
    println!(
        "   Indexed {} points across {} trips\n",
        stats.total_points, stats.group_count
    );

    // === VIEWPORT PROJECTION ===
    println!("2. Projecting a Viewport");
    println!("------------------------");

    // A continent-level view: nearby photos merge into clusters.
    let europe = Viewport::new(-10.0, 35.0, 30.0, 60.0, 5.0);
    let records = project(&registry, &europe);
    println!("   Europe at zoom 5 draws {} marker(s):", records.len());
    for record in &records {
        if record.is_cluster {
            println!(
                "     - cluster {} ({} photos)",
                record.composite_id, record.count
            );
        } else {
            println!("     - photo {}", record.composite_id);
        }
    }
    println!();

    // === DRILLING INTO A CLUSTER ===
    println!("3. Drilling Into a Cluster");
    println!("--------------------------");

    if let Some(cluster) = records.iter().find(|r| r.is_cluster) {
        let zoom = trailmark::expansion_zoom(&registry, &cluster.composite_id)?;
        println!("   {} splits apart at zoom {}", cluster.composite_id, zoom);

        let leaves = trailmark::leaves(&registry, &cluster.composite_id, 10)?;
        println!("   Member photos:");
        for leaf in leaves {
            println!("     - {}", leaf.id);
        }
    }
    println!();

    // === DEBOUNCED MAP MOVEMENT ===
    println!("4. Debounced Map Movement");
    println!("-------------------------");

    let mut coalescer = UpdateCoalescer::new(Duration::from_millis(200));
    let start = Instant::now();

    // A pan gesture produces a burst of viewport updates; only the last
    // one is projected, once the map settles.
    for step in 0..5 {
        let viewport = Viewport::new(
            -10.0 + step as f64,
            35.0,
            30.0 + step as f64,
            60.0,
            5.0,
        );
        coalescer.notify_now(viewport);
    }
    std::thread::sleep(Duration::from_millis(250));

    if let Some(records) = coalescer.run_due(Instant::now(), |v| Ok(project(&registry, v))) {
        println!(
            "   Settled after {:?}, drew {} marker(s)\n",
            start.elapsed(),
            records.len()
        );
    }

    // === TRACK SIMPLIFICATION ===
    println!("5. Track Polylines");
    println!("------------------");

    for zoom in [15.0, 4.0] {
        let segments = track_segments(&items, zoom, &TrackConfig::default());
        let vertices: usize = segments.iter().map(|s| s.coordinates.len()).sum();
        println!(
            "   Zoom {:>4}: {} segment(s), {} vertices",
            zoom,
            segments.len(),
            vertices
        );
    }

    println!("\n=== Getting Started Complete! ===");
    Ok(())
}
