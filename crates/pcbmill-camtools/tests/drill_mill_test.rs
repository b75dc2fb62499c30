use std::f64::consts::PI;

use pcbmill_camtools::{CavcKernel, DrillToMillConverter};
use pcbmill_core::{DrillTool, ExcellonObject, Point, ToolId};

fn holes(count: usize, diameter: f64) -> ExcellonObject {
    ExcellonObject {
        name: "drills".to_string(),
        tools: vec![DrillTool {
            tool_id: ToolId(1),
            diameter,
            drills: (0..count)
                .map(|i| Point::new(i as f64 * 3.0, 1.0))
                .collect(),
            slots: Vec::new(),
        }],
    }
}

#[test]
fn test_one_ring_per_hole_with_expected_area() {
    let kernel = CavcKernel::default();
    let converter = DrillToMillConverter::new(&kernel, 0.8).unwrap();
    let rings = converter
        .drills_to_mill(&holes(5, 2.0), &[ToolId(1)])
        .unwrap();
    assert_eq!(rings.len(), 5);

    let radius: f64 = 1.0 - 0.4;
    let expected = PI * radius * radius;
    for ring in &rings {
        assert!(ring.interiors.is_empty());
        assert!((ring.area() - expected).abs() / expected < 0.01);
    }
}

#[test]
fn test_ring_centers_follow_holes() {
    let kernel = CavcKernel::default();
    let converter = DrillToMillConverter::new(&kernel, 1.0).unwrap();
    let rings = converter
        .drills_to_mill(&holes(3, 1.5), &[ToolId(1)])
        .unwrap();
    for (i, ring) in rings.iter().enumerate() {
        let center = ring.bounds().unwrap().center();
        assert!(center.distance_to(&Point::new(i as f64 * 3.0, 1.0)) < 1e-9);
    }
}
