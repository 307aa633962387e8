use std::collections::BTreeSet;

use coremap::axial::{self, AxialCuts, CoarseGrid};
use coremap::symmetry;
use coremap::{
    AssemblyGeometry, AxialCut, ConfigurationStore, CoreBuilder, CoreGrid, LatticeMap, Numbering,
    PerturbPayload, Perturbation, ReplaceAxialPayload, Rotation, Shape, TranslatePayload, ZRange,
};
use proptest::collection::{btree_set, vec};
use proptest::prelude::*;

// Radius-n hexagonal wedge with values 1..=9 and matching edges.
fn hex_sector_strategy() -> impl Strategy<Value = CoreGrid> {
    (1usize..=5).prop_flat_map(|n| {
        let count = 1 + n + n * (n - 1) / 2;
        vec(1i64..=9, count).prop_map(move |values| {
            let mut values = values.into_iter();
            let mut next = move || values.next().unwrap_or(1);
            let mut sector = CoreGrid::new(n + 1, n + 1);
            sector.set(n, 0, next());
            for q in 1..=n {
                let edge = next();
                sector.set(n, q, edge);
                sector.set(n - q, q, edge);
            }
            for row in 1..n {
                for col in (n - row + 1)..=n {
                    sector.set(row, col, next());
                }
            }
            sector
        })
    })
}

fn square_rotation_strategy() -> impl Strategy<Value = Rotation> {
    prop_oneof![
        Just(Rotation::Half),
        Just(Rotation::Quadrant),
        Just(Rotation::Octant)
    ]
}

// Canonical square sector of an n x n core for `rotation`.
fn square_sector_strategy(rotation: Rotation) -> impl Strategy<Value = CoreGrid> {
    (1usize..=8).prop_flat_map(move |n| {
        vec(1i64..=9, n * n).prop_map(move |values| {
            let mid = (n - 1) / 2;
            let mut sector = CoreGrid::new(n, n);
            for row in 0..n {
                for col in 0..n {
                    let inside = match rotation {
                        Rotation::Half => row <= mid,
                        Rotation::Quadrant => row <= mid && col <= mid,
                        Rotation::Octant => row <= mid && col <= mid && col >= row,
                        _ => true,
                    };
                    if inside {
                        sector.set(row, col, values[row * n + col]);
                    }
                }
            }
            sector
        })
    })
}

// Sorted boundaries 0 = b0 < b1 < ... < bk = 100 on whole centimetres.
fn boundaries_strategy(pieces: std::ops::RangeInclusive<usize>) -> impl Strategy<Value = Vec<f64>> {
    pieces.prop_flat_map(|pieces| {
        btree_set(1u32..100, pieces - 1).prop_map(|inner: BTreeSet<u32>| {
            std::iter::once(0.0)
                .chain(inner.into_iter().map(f64::from))
                .chain(std::iter::once(100.0))
                .collect()
        })
    })
}

fn cuts_from(bounds: &[f64]) -> Vec<AxialCut> {
    bounds
        .windows(2)
        .enumerate()
        .map(|(i, w)| AxialCut::new(format!("r{}", i % 3), "", w[0], w[1]))
        .collect()
}

fn contiguous(cuts: &AxialCuts) -> bool {
    cuts.cuts().windows(2).all(|w| w[0].upper == w[1].lower)
}

#[derive(Debug, Clone)]
enum Step {
    Paint { which: Vec<u32>, bin: usize, absorber: bool },
    Perturb { which: Vec<u32>, bin: usize },
    Translate { which: Vec<u32>, up: bool },
}

fn step_strategy() -> impl Strategy<Value = Step> {
    let which = || vec(1u32..=9, 1..=4);
    prop_oneof![
        (which(), 0usize..5, any::<bool>())
            .prop_map(|(which, bin, absorber)| Step::Paint { which, bin, absorber }),
        (which(), 0usize..5).prop_map(|(which, bin)| Step::Perturb { which, bin }),
        (which(), any::<bool>()).prop_map(|(which, up)| Step::Translate { which, up }),
    ]
}

// 3x3 quadrant-symmetric core, every position filled.
fn quadrant_store() -> ConfigurationStore {
    CoreBuilder::new()
        .geometry(AssemblyGeometry::new(Shape::Square, 21.5).unwrap())
        .rotation(Rotation::Quadrant)
        .sector(CoreGrid::from_rows(vec![vec![1, 2, 0], vec![2, 1, 0], vec![0, 0, 0]]).unwrap())
        .assembly_type(
            "A",
            vec![
                AxialCut::new("fuel", "", 0.0, 70.0),
                AxialCut::new("refl", "", 70.0, 100.0),
            ],
        )
        .assembly_type("B", vec![AxialCut::new("refl", "", 0.0, 100.0)])
        .region("b4c")
        .region("ag")
        .zcuts(vec![0.0, 25.0, 50.0, 75.0, 100.0])
        .build()
        .unwrap()
}

const BINS: [(f64, f64); 5] = [(0.0, 25.0), (25.0, 50.0), (50.0, 75.0), (75.0, 100.0), (0.0, 50.0)];

proptest! {
    #[test]
    fn hex_numbering_is_a_bijection(sector in hex_sector_strategy()) {
        let n = sector.rows() - 1;
        let geometry = AssemblyGeometry::new(Shape::Hexagon, 16.2).unwrap();
        let full = symmetry::unfold(&sector, Rotation::Sextant).unwrap();
        let map = LatticeMap::new(&full, geometry, Rotation::Sextant).unwrap();
        let total = 3 * n * (n + 1) + 1;
        prop_assert_eq!(map.len(), total);
        let total = u32::try_from(total).unwrap();
        for id in 1..=total {
            prop_assert_eq!(map.to_library(map.to_application(id).unwrap()).unwrap(), id);
            prop_assert_eq!(map.to_application(map.to_library(id).unwrap()).unwrap(), id);
        }
        let apps: BTreeSet<u32> = (1..=total).map(|lib| map.to_application(lib).unwrap()).collect();
        prop_assert_eq!(apps.len(), map.len());
    }

    #[test]
    fn hex_unfold_then_fold_recovers_sector(sector in hex_sector_strategy()) {
        let n = sector.rows() - 1;
        let full = symmetry::unfold(&sector, Rotation::Sextant).unwrap();
        prop_assert_eq!(full.count_nonzero(), 3 * n * (n + 1) + 1);
        prop_assert_eq!(symmetry::fold(&full, Rotation::Sextant).unwrap(), sector);
    }

    #[test]
    fn square_unfold_then_fold_recovers_sector(
        (rotation, sector) in square_rotation_strategy()
            .prop_flat_map(|rotation| (Just(rotation), square_sector_strategy(rotation)))
    ) {
        let full = symmetry::unfold(&sector, rotation).unwrap();
        prop_assert_eq!(&full, &full.flipped_rows());
        prop_assert_eq!(symmetry::fold(&full, rotation).unwrap(), sector);
    }

    #[test]
    fn quadrant_cores_are_mirror_symmetric(sector in square_sector_strategy(Rotation::Quadrant)) {
        let full = symmetry::unfold(&sector, Rotation::Quadrant).unwrap();
        prop_assert_eq!(&full, &full.flipped_cols());
    }

    #[test]
    fn octant_cores_are_transpose_symmetric(sector in square_sector_strategy(Rotation::Octant)) {
        let full = symmetry::unfold(&sector, Rotation::Octant).unwrap();
        prop_assert_eq!(&full, &full.transposed());
    }

    #[test]
    fn slot_weights_sum_to_one(
        bounds in boundaries_strategy(1..=7),
        zcuts in boundaries_strategy(1..=7)
    ) {
        let bins = zcuts.len() - 1;
        let cuts = AxialCuts::new("T", cuts_from(&bounds)).unwrap();
        let grid = CoarseGrid::new(zcuts).unwrap();
        let slots = axial::slots("T", &cuts, &grid).unwrap();
        prop_assert_eq!(slots.len(), bins);
        for bin in &slots {
            let sum: f64 = bin.iter().map(|s| s.weight).sum();
            prop_assert!((sum - 1.0).abs() <= 1e-5, "sum {}", sum);
            prop_assert!(bin.iter().all(|s| s.weight > 0.0));
        }
    }

    #[test]
    fn validated_cuts_are_contiguous(
        (bounds, flip) in boundaries_strategy(1..=6)
            .prop_flat_map(|bounds| {
                let pieces = bounds.len() - 1;
                (Just(bounds), 0..pieces)
            })
    ) {
        let pieces = bounds.len() - 1;
        // Top-down listing with one inverted cut.
        let mut raw = cuts_from(&bounds);
        raw.reverse();
        let cut = &mut raw[flip];
        std::mem::swap(&mut cut.lower, &mut cut.upper);

        let cuts = AxialCuts::new("T", raw).unwrap();
        prop_assert_eq!(cuts.boundaries(), bounds.clone());
        prop_assert!(contiguous(&cuts));

        let painted = cuts.painted(ZRange::new(bounds[0], bounds[1]).unwrap(), "b4c").unwrap();
        prop_assert!(contiguous(&painted));
        if pieces > 1 {
            let first = bounds[1] - bounds[0];
            let last = bounds[pieces] - bounds[pieces - 1];
            let shifted = cuts.shifted("T", 0.5 * first.min(last)).unwrap();
            prop_assert!(contiguous(&shifted));
            prop_assert_eq!(shifted.bottom(), 0.0);
            prop_assert_eq!(shifted.top(), 100.0);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn registries_never_shrink_during_a_run(steps in vec(step_strategy(), 1..40)) {
        let mut store = quadrant_store();
        let mut sizes = (store.types().len(), store.regions().len());
        for (i, step) in steps.into_iter().enumerate() {
            let at = f64::from(u32::try_from(i).unwrap() + 1);
            let location = |bin: usize| ZRange::new(BINS[bin].0, BINS[bin].1).unwrap();
            // Failures (ambiguous targets, collapsing shifts) are fine here.
            let _ = match step {
                Step::Paint { which, bin, absorber } => store.replace_axial(&ReplaceAxialPayload {
                    which: vec![which],
                    locations: vec![location(bin)],
                    with: vec![if absorber { "b4c" } else { "ag" }.to_string()],
                    numbering: Numbering::Library,
                    at,
                }),
                Step::Perturb { which, bin } => store.perturb_material(&PerturbPayload {
                    which: vec![which],
                    locations: vec![location(bin)],
                    perturbations: vec![Perturbation::Density { factor: 1.01 }],
                    numbering: Numbering::Library,
                    at,
                }),
                Step::Translate { which, up } => store.translate_axial(&TranslatePayload {
                    which,
                    dz: if up { 5.0 } else { -5.0 },
                    numbering: Numbering::Library,
                    at,
                }),
            };
            let now = (store.types().len(), store.regions().len());
            prop_assert!(now.0 >= sizes.0 && now.1 >= sizes.1, "step {}: {:?} -> {:?}", i, sizes, now);
            sizes = now;
        }
    }
}
