use polars::prelude::*;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use std::collections::BTreeMap;

use super::error::PostProcError;
use super::hit_data::HitData;

/// Gaussian resolution broadening with sqrt(E) scaling, calibrated so that
/// `pct_res_at_1mev` is the percent resolution at 1 MeV. Small energies with
/// large smearing can go negative; that is part of the model, not clamped.
pub fn smear_energy<R: Rng>(energy: f64, pct_res_at_1mev: f64, rng: &mut R) -> f64 {
    let z: f64 = StandardNormal.sample(rng);
    energy + energy.sqrt() * pct_res_at_1mev / 100.0 * z
}

fn int_series(steps: &DataFrame, field: &str) -> Result<Series, PostProcError> {
    let series = steps
        .column(field)
        .map_err(|_| PostProcError::MissingField(field.to_string()))?
        .cast(&DataType::Int64)?;
    Ok(series)
}

fn float_series(steps: &DataFrame, field: &str) -> Result<Series, PostProcError> {
    let series = steps
        .column(field)
        .map_err(|_| PostProcError::MissingField(field.to_string()))?
        .cast(&DataType::Float64)?;
    Ok(series)
}

/// Collapse a step table into one row per (event, detector replica) with a
/// resolution-smeared total energy.
///
/// Steps are kept when they deposited energy inside the target volume, summed
/// over the composite key (event, volID, iRep), and emitted in ascending key
/// order with one standard-normal draw per output row. A seeded `rng` makes
/// the whole transform reproducible.
pub fn aggregate<R: Rng>(
    steps: &DataFrame,
    target_vol_id: i64,
    pct_res_at_1mev: f64,
    rng: &mut R,
) -> Result<DataFrame, PostProcError> {
    if pct_res_at_1mev < 0.0 {
        return Err(PostProcError::Domain(format!(
            "percent resolution at 1 MeV must be non-negative, got {}",
            pct_res_at_1mev
        )));
    }

    let event_series = int_series(steps, "event")?;
    let edep_series = float_series(steps, "Edep")?;
    let vol_series = int_series(steps, "volID")?;
    let irep_series = int_series(steps, "iRep")?;

    let events = event_series.i64()?;
    let edeps = edep_series.f64()?;
    let vols = vol_series.i64()?;
    let ireps = irep_series.i64()?;

    //Sum deposits per composite key; the ordered map is also the emission order
    let mut sums: BTreeMap<(i64, i64, i64), f64> = BTreeMap::new();
    let rows = events.into_iter().zip(edeps).zip(vols).zip(ireps);
    for (((event, edep), vol), irep) in rows {
        if let (Some(event), Some(edep), Some(vol), Some(irep)) = (event, edep, vol, irep) {
            if edep > 0.0 && vol == target_vol_id {
                *sums.entry((event, vol, irep)).or_insert(0.0) += edep;
            }
        }
    }

    //volID was the filter target, so it is constant and dropped from the output
    let mut hits = HitData::default();
    for ((event, _vol, irep), raw_energy) in sums {
        hits.push_hit(event, irep, smear_energy(raw_energy, pct_res_at_1mev, rng));
    }

    log::info!(
        "Aggregated {} steps into {} detector hits",
        steps.height(),
        hits.rows()
    );

    Ok(hits.into_dataframe()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn step_table() -> DataFrame {
        df!(
            "event" => [1i64, 1, 1, 2],
            "step" => [0i64, 1, 2, 0],
            "Edep" => [0.5f64, 0.3, 0.1, -0.1],
            "volID" => [2i64, 2, 2, 2],
            "iRep" => [0i64, 0, 1, 0],
        )
        .unwrap()
    }

    #[test]
    fn test_aggregate_sums_per_event_and_replica() {
        let mut rng = StdRng::seed_from_u64(0);
        let df = aggregate(&step_table(), 2, 0.0, &mut rng).unwrap();

        assert_eq!(df.height(), 2);
        assert_eq!(df.get_column_names(), &["event", "detID", "energy"]);

        let events = df.column("event").unwrap().i64().unwrap();
        let det_ids = df.column("detID").unwrap().i64().unwrap();
        let energies = df.column("energy").unwrap().f64().unwrap();

        assert_eq!(events.get(0), Some(1));
        assert_eq!(det_ids.get(0), Some(0));
        assert_eq!(energies.get(0), Some(0.8));

        assert_eq!(events.get(1), Some(1));
        assert_eq!(det_ids.get(1), Some(1));
        assert_eq!(energies.get(1), Some(0.1));
    }

    #[test]
    fn test_nonpositive_deposits_are_dropped_entirely() {
        // event 2 only has the negative deposit, so it gets no output row
        let mut rng = StdRng::seed_from_u64(0);
        let df = aggregate(&step_table(), 2, 0.0, &mut rng).unwrap();
        let events = df.column("event").unwrap().i64().unwrap();
        for i in 0..df.height() {
            assert_ne!(events.get(i), Some(2));
        }
    }

    #[test]
    fn test_mismatched_volume_yields_empty_table_with_schema() {
        let mut rng = StdRng::seed_from_u64(0);
        let df = aggregate(&step_table(), 7, 0.0, &mut rng).unwrap();
        assert_eq!(df.height(), 0);
        assert_eq!(df.get_column_names(), &["event", "detID", "energy"]);
        assert_eq!(df.column("energy").unwrap().dtype(), &DataType::Float64);
    }

    #[test]
    fn test_output_rows_are_sorted_by_event_then_replica() {
        let steps = df!(
            "event" => [5i64, 1, 5, 3, 1],
            "Edep" => [0.2f64, 0.1, 0.4, 0.3, 0.5],
            "volID" => [2i64, 2, 2, 2, 2],
            "iRep" => [1i64, 0, 0, 0, 1],
        )
        .unwrap();

        let mut rng = StdRng::seed_from_u64(0);
        let df = aggregate(&steps, 2, 0.0, &mut rng).unwrap();

        let events = df.column("event").unwrap().i64().unwrap();
        let det_ids = df.column("detID").unwrap().i64().unwrap();
        let order: Vec<(i64, i64)> = (0..df.height())
            .map(|i| (events.get(i).unwrap(), det_ids.get(i).unwrap()))
            .collect();
        assert_eq!(order, vec![(1, 0), (1, 1), (3, 0), (5, 0), (5, 1)]);
    }

    #[test]
    fn test_seeded_aggregation_is_reproducible() {
        let steps = step_table();
        let mut rng_a = StdRng::seed_from_u64(42);
        let mut rng_b = StdRng::seed_from_u64(42);
        let a = aggregate(&steps, 2, 5.0, &mut rng_a).unwrap();
        let b = aggregate(&steps, 2, 5.0, &mut rng_b).unwrap();
        assert!(a.equals(&b));
    }

    #[test]
    fn test_one_draw_per_row_in_emission_order() {
        let mut rng = StdRng::seed_from_u64(7);
        let df = aggregate(&step_table(), 2, 10.0, &mut rng).unwrap();
        let energies = df.column("energy").unwrap().f64().unwrap();

        let mut replay = StdRng::seed_from_u64(7);
        let expected = [
            smear_energy(0.8, 10.0, &mut replay),
            smear_energy(0.1, 10.0, &mut replay),
        ];
        assert_eq!(energies.get(0), Some(expected[0]));
        assert_eq!(energies.get(1), Some(expected[1]));
    }

    #[test]
    fn test_zero_resolution_leaves_sums_untouched() {
        // any seed must give the raw sums back when the resolution is zero
        for seed in [0u64, 1, 99] {
            let mut rng = StdRng::seed_from_u64(seed);
            let df = aggregate(&step_table(), 2, 0.0, &mut rng).unwrap();
            let energies = df.column("energy").unwrap().f64().unwrap();
            assert_eq!(energies.get(0), Some(0.8));
            assert_eq!(energies.get(1), Some(0.1));
        }
    }

    #[test]
    fn test_zero_energy_smears_to_exactly_zero() {
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(smear_energy(0.0, 25.0, &mut rng), 0.0);
    }

    #[test]
    fn test_smearing_can_go_negative_without_clamping() {
        let mut rng = StdRng::seed_from_u64(0);
        let smeared: Vec<f64> = (0..100)
            .map(|_| smear_energy(0.01, 1.0e4, &mut rng))
            .collect();
        assert!(smeared.iter().any(|energy| *energy < 0.0));
    }

    #[test]
    fn test_negative_resolution_is_a_domain_error() {
        let mut rng = StdRng::seed_from_u64(0);
        let result = aggregate(&step_table(), 2, -1.0, &mut rng);
        assert!(matches!(result, Err(PostProcError::Domain(_))));
    }

    #[test]
    fn test_missing_required_field_is_an_error() {
        let steps = df!(
            "event" => [1i64],
            "Edep" => [0.5f64],
            "volID" => [2i64],
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let result = aggregate(&steps, 2, 0.0, &mut rng);
        assert!(matches!(result, Err(PostProcError::MissingField(field)) if field == "iRep"));
    }

    #[test]
    fn test_narrower_integer_columns_are_accepted() {
        let steps = df!(
            "event" => [1i32, 1],
            "Edep" => [0.25f32, 0.25],
            "volID" => [2i32, 2],
            "iRep" => [0i32, 0],
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let df = aggregate(&steps, 2, 0.0, &mut rng).unwrap();
        assert_eq!(df.height(), 1);
        let energies = df.column("energy").unwrap().f64().unwrap();
        assert_eq!(energies.get(0), Some(0.5));
    }
}
