use pcbmill_camtools::{plan_depths, resolve_offset, vbit_cut_z};
use pcbmill_core::{OffsetType, ToolId};
use proptest::prelude::*;

proptest! {
    #[test]
    fn prop_offset_identities(diameter in 0.001f64..10.0) {
        let id = ToolId(1);
        prop_assert_eq!(resolve_offset(OffsetType::Path, diameter, None, id), Ok(0.0));
        prop_assert_eq!(resolve_offset(OffsetType::In, diameter, None, id), Ok(-diameter / 2.0));
        prop_assert_eq!(resolve_offset(OffsetType::Out, diameter, None, id), Ok(diameter / 2.0));
    }

    #[test]
    fn prop_depth_plan_reaches_cut_z(cut_z in -5.0f64..-0.001, depth_per_pass in 0.01f64..2.0) {
        let depths = plan_depths(cut_z, depth_per_pass, true).unwrap();
        prop_assert_eq!(*depths.last().unwrap(), cut_z);

        let mut previous = 0.0;
        for z in &depths {
            let step = previous - z;
            prop_assert!(step > 0.0);
            prop_assert!(step <= depth_per_pass + 1e-9);
            previous = *z;
        }
    }

    #[test]
    fn prop_single_pass_without_multidepth(cut_z in -5.0f64..5.0, depth_per_pass in 0.01f64..2.0) {
        prop_assert_eq!(plan_depths(cut_z, depth_per_pass, false), Ok(vec![cut_z]));
    }

    #[test]
    fn prop_vbit_depth_grows_with_width(
        tip in 0.0f64..0.2,
        angle in 10.0f64..170.0,
        width in 0.3f64..2.0,
    ) {
        let (narrow, fallback) = vbit_cut_z(width, tip, angle, -0.1);
        prop_assert!(!fallback);
        let (wide, _) = vbit_cut_z(width + 0.1, tip, angle, -0.1);
        prop_assert!(wide < narrow);
    }
}
