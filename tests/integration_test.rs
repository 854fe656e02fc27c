//! End-to-end tests: build aligned datasets and pull scores out of them

use ndarray::Array3;
use std::io::Write;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;
use tempfile::NamedTempFile;
use verif_align::prelude::*;

const JAN_1_2017: i64 = 1_483_228_800;
const JAN_15_2017: i64 = 1_484_438_400;
const JAN_20_2017: i64 = 1_484_870_400;
const FEB_1_2017: i64 = 1_485_907_200;
const FEB_3_2017: i64 = 1_486_080_000;

fn one_location() -> Vec<Location> {
    vec![Location::new(1, 60.0, 10.0, 100.0)]
}

/// Source with one offset and one location; obs/fcst indexed by time only
fn series(name: &str, times: Vec<i64>, obs: Vec<f64>, fcst: Vec<f64>) -> MemorySource {
    let n = times.len();
    MemorySource::new(name, times, vec![0.0], one_location())
        .with_obs(Array3::from_shape_vec((n, 1, 1), obs).unwrap())
        .with_fcst(Array3::from_shape_vec((n, 1, 1), fcst).unwrap())
}

fn build(sources: Vec<MemorySource>, options: AlignOptions) -> Result<AlignedDataset> {
    let boxed = sources
        .into_iter()
        .map(|s| Box::new(s) as Box<dyn Source>)
        .collect();
    AlignedDataset::build(boxed, options)
}

#[test]
fn test_partial_time_overlap() -> Result<()> {
    let a = series("a", vec![100, 200, 300], vec![1.0, 2.0, 3.0], vec![10.0, 20.0, 30.0]);
    let b = series("b", vec![200, 300, 400], vec![2.0, 3.0, 4.0], vec![21.0, 31.0, 41.0]);
    let data = build(vec![a, b], AlignOptions::default())?;

    assert_eq!(data.times(), &[200, 300]);
    assert_eq!(data.offsets(), &[0.0]);
    assert_eq!(data.location_ids(), vec![1]);
    assert_eq!(data.num_sources(), 2);

    let a_fcst = data.get_scores(&[Field::Fcst], 0, Axis::Time, Some(0))?;
    let b_fcst = data.get_scores(&[Field::Fcst], 1, Axis::Time, Some(0))?;
    assert_eq!(a_fcst[0].as_slice().unwrap(), &[20.0]);
    assert_eq!(b_fcst[0].as_slice().unwrap(), &[21.0]);
    Ok(())
}

#[test]
fn test_unsorted_times_are_aligned_by_value() -> Result<()> {
    let a = series("a", vec![300, 100, 200], vec![3.0, 1.0, 2.0], vec![3.0, 1.0, 2.0]);
    let b = series("b", vec![200, 300], vec![2.5, 3.5], vec![2.5, 3.5]);
    let data = build(vec![a, b], AlignOptions::default())?;

    assert_eq!(data.times(), &[200, 300]);
    let a_obs = data.field(Field::Obs, 0)?;
    assert_eq!(a_obs.iter().copied().collect::<Vec<_>>(), vec![2.0, 3.0]);
    Ok(())
}

#[test]
fn test_building_twice_is_deterministic() -> Result<()> {
    let make = || {
        vec![
            series("a", vec![100, 200, 300], vec![1.0, f64::NAN, 3.0], vec![1.5, 2.5, 3.5]),
            series("b", vec![300, 200], vec![3.1, 2.1], vec![3.2, 2.2]),
        ]
    };
    let first = build(make(), AlignOptions::default())?;
    let second = build(make(), AlignOptions::default())?;

    assert_eq!(first.axes(), second.axes());
    for source_index in 0..2 {
        let x = first.field(Field::Obs, source_index)?;
        let y = second.field(Field::Obs, source_index)?;
        assert_eq!(x.shape(), y.shape());
        for (a, b) in x.iter().zip(y.iter()) {
            assert!(a == b || (a.is_nan() && b.is_nan()));
        }
    }
    Ok(())
}

#[test]
fn test_month_and_year_buckets() -> Result<()> {
    let times = vec![JAN_15_2017, JAN_20_2017, FEB_3_2017];
    let a = series("a", times, vec![1.0, 2.0, 3.0], vec![1.1, 2.1, 3.1]);
    let data = build(vec![a], AlignOptions::default())?;

    assert_eq!(data.months(), &[JAN_1_2017, FEB_1_2017]);
    assert_eq!(data.years(), &[JAN_1_2017]);
    assert_eq!(data.axis_size(Axis::Month), 2);

    let january = data.get_scores(&[Field::Obs], 0, Axis::Month, Some(0))?;
    assert_eq!(january[0].as_slice().unwrap(), &[1.0, 2.0]);
    let february = data.get_scores(&[Field::Obs], 0, Axis::Month, Some(1))?;
    assert_eq!(february[0].as_slice().unwrap(), &[3.0]);

    let year = data.get_scores(&[Field::Obs], 0, Axis::Year, Some(0))?;
    assert_eq!(year[0].len(), 3);

    assert_eq!(
        data.axis_descriptions(Axis::Month, false)?,
        vec!["2017/01/01".to_string(), "2017/02/01".to_string()]
    );
    Ok(())
}

#[test]
fn test_climatology_subtract_and_divide() -> Result<()> {
    let times = vec![100, 200, 300];
    let make = || series("a", times.clone(), vec![2.0, 4.0, 6.0], vec![3.0, 5.0, 8.0]);
    let clim = || {
        Box::new(series("clim", times.clone(), vec![0.0; 3], vec![1.0, 2.0, 4.0])) as Box<dyn Source>
    };

    let subtract = build(
        vec![make()],
        AlignOptions {
            climatology: Some(clim()),
            ..AlignOptions::default()
        },
    )?;
    assert_eq!(subtract.num_sources(), 1);
    assert!(subtract.has_climatology());
    let fcst = subtract.get_scores(&[Field::Fcst], 0, Axis::No, None)?;
    assert_eq!(fcst[0].as_slice().unwrap(), &[2.0, 3.0, 4.0]);
    let obs = subtract.get_scores(&[Field::Obs], 0, Axis::Time, Some(2))?;
    assert_eq!(obs[0].as_slice().unwrap(), &[2.0]);

    let divide = build(
        vec![make()],
        AlignOptions {
            climatology: Some(clim()),
            climatology_mode: ClimatologyMode::Divide,
            ..AlignOptions::default()
        },
    )?;
    let obs = divide.get_scores(&[Field::Obs], 0, Axis::No, None)?;
    assert_eq!(obs[0].as_slice().unwrap(), &[2.0, 2.0, 1.5]);
    Ok(())
}

#[test]
fn test_climatology_leaves_other_fields_alone() -> Result<()> {
    let times = vec![100, 200];
    let a = series("a", times.clone(), vec![1.0, 1.0], vec![1.0, 1.0]);
    let clim = series("clim", times, vec![0.0, 0.0], vec![0.5, 0.5]);
    let data = build(
        vec![a],
        AlignOptions {
            climatology: Some(Box::new(clim)),
            ..AlignOptions::default()
        },
    )?;

    // Window of a constant 1.0 signal crosses immediately at every offset
    let scores = data.get_scores(&[Field::ObsWindow, Field::Obs], 0, Axis::No, None)?;
    assert_eq!(scores[0].as_slice().unwrap(), &[0.0, 0.0]);
    assert_eq!(scores[1].as_slice().unwrap(), &[0.5, 0.5]);
    Ok(())
}

#[test]
fn test_forecast_only_climatology() -> Result<()> {
    let times = vec![100, 200];
    let a = series("a", times.clone(), vec![5.0, f64::NAN], vec![4.0, 6.0]);
    let b = series("b", times.clone(), vec![7.0, 8.0], vec![1.0, 2.0]);
    let clim = MemorySource::new("clim", times, vec![0.0], one_location())
        .with_fcst(Array3::from_shape_vec((2, 1, 1), vec![1.0, 3.0])?);
    let data = build(
        vec![a, b],
        AlignOptions {
            climatology: Some(Box::new(clim)),
            ..AlignOptions::default()
        },
    )?;

    let obs = data.get_scores(&[Field::Obs], 1, Axis::No, None)?;
    assert_eq!(obs[0].as_slice().unwrap(), &[6.0]);
    let fcst = data.get_scores(&[Field::Fcst], 0, Axis::No, None)?;
    assert_eq!(fcst[0].as_slice().unwrap(), &[3.0, 3.0]);

    // The climatology is not part of the obs batch
    let raw_obs = data.field(Field::Obs, 1)?;
    assert!(raw_obs[[1, 0, 0]].is_nan());
    assert!(data.field(Field::Obs, 2).is_err());
    assert!(data.get_scores(&[Field::ObsWindow], 0, Axis::No, None).is_ok());
    Ok(())
}

#[test]
fn test_climatology_missing_values_reach_visible_forecasts() -> Result<()> {
    let times = vec![100, 200, 300];
    let a = series("a", times.clone(), vec![1.0; 3], vec![1.0, 2.0, 3.0]);
    let b = series("b", times.clone(), vec![1.0; 3], vec![4.0, 5.0, 6.0]);
    let clim = MemorySource::new("clim", times, vec![0.0], one_location())
        .with_fcst(Array3::from_shape_vec((3, 1, 1), vec![0.0, f64::NAN, 0.0])?);
    let data = build(
        vec![a, b],
        AlignOptions {
            climatology: Some(Box::new(clim)),
            ..AlignOptions::default()
        },
    )?;

    for source in 0..data.num_sources() {
        let fcst = data.field(Field::Fcst, source)?;
        assert!(fcst[[1, 0, 0]].is_nan());
        assert!(fcst[[0, 0, 0]].is_finite());
        assert!(fcst[[2, 0, 0]].is_finite());
    }
    let obs = data.field(Field::Obs, 0)?;
    assert!(obs.iter().all(|v| v.is_finite()));
    Ok(())
}

#[test]
fn test_climatology_restricts_thresholds() -> Result<()> {
    let scores = ndarray::Array4::from_shape_vec((1, 1, 1, 2), vec![0.8, 0.2])?;
    let a = series("a", vec![1], vec![1.0], vec![1.0])
        .with_thresholds(vec![1.0, 5.0], scores.clone());
    let b = series("b", vec![1], vec![1.0], vec![1.0])
        .with_thresholds(vec![5.0, 1.0], scores);
    let clim = MemorySource::new("clim", vec![1], vec![0.0], one_location())
        .with_fcst(Array3::zeros((1, 1, 1)))
        .with_thresholds(vec![1.0], ndarray::Array4::zeros((1, 1, 1, 1)));
    let data = build(
        vec![a, b],
        AlignOptions {
            climatology: Some(Box::new(clim)),
            ..AlignOptions::default()
        },
    )?;

    assert_eq!(data.thresholds(), &[1.0]);
    let p1 = data.get_scores(&[Field::Threshold(1.0)], 1, Axis::No, None)?;
    assert_eq!(p1[0].as_slice().unwrap(), &[0.2]);
    Ok(())
}

#[test]
fn test_missing_values_propagate_across_sources() -> Result<()> {
    let a = series("a", vec![1, 2, 3], vec![1.0, f64::NAN, 3.0], vec![1.0, 2.0, 3.0]);
    let b = series("b", vec![1, 2, 3], vec![4.0, 5.0, f64::NAN], vec![4.0, 5.0, 6.0]);
    let data = build(vec![a, b], AlignOptions::default())?;

    let a_obs = data.field(Field::Obs, 0)?;
    let b_obs = data.field(Field::Obs, 1)?;
    let a_nan: Vec<bool> = a_obs.iter().map(|v| v.is_nan()).collect();
    let b_nan: Vec<bool> = b_obs.iter().map(|v| v.is_nan()).collect();
    assert_eq!(a_nan, vec![false, true, true]);
    assert_eq!(a_nan, b_nan);

    let scores = data.get_scores(&[Field::Obs], 1, Axis::No, None)?;
    assert_eq!(scores[0].as_slice().unwrap(), &[4.0]);
    Ok(())
}

#[test]
fn test_missing_values_kept_per_source_when_disabled() -> Result<()> {
    let a = series("a", vec![1, 2, 3], vec![1.0, f64::NAN, 3.0], vec![1.0, 2.0, 3.0]);
    let b = series("b", vec![1, 2, 3], vec![4.0, 5.0, f64::NAN], vec![4.0, 5.0, 6.0]);
    let data = build(
        vec![a, b],
        AlignOptions {
            require_consistent_missingness: false,
            ..AlignOptions::default()
        },
    )?;

    let scores = data.get_scores(&[Field::Obs], 0, Axis::No, None)?;
    assert_eq!(scores[0].as_slice().unwrap(), &[1.0, 3.0]);
    Ok(())
}

#[test]
fn test_joint_masking_on_flattened_axes() -> Result<()> {
    let a = series(
        "a",
        vec![1, 2, 3, 4],
        vec![f64::NAN, 2.0, 3.0, 4.0],
        vec![1.0, 2.0, f64::INFINITY, 4.0],
    );
    let data = build(vec![a], AlignOptions::default())?;

    let scores = data.get_scores(&[Field::Obs, Field::Fcst], 0, Axis::No, None)?;
    assert_eq!(scores.len(), 2);
    assert_eq!(scores[0].as_slice().unwrap(), &[2.0, 4.0]);
    assert_eq!(scores[1].as_slice().unwrap(), &[2.0, 4.0]);
    Ok(())
}

#[test]
fn test_all_axis_keeps_shape_and_marks_invalid() -> Result<()> {
    let a = series("a", vec![1, 2, 3], vec![f64::NAN, 2.0, 3.0], vec![1.0, 2.0, f64::NAN]);
    let data = build(vec![a], AlignOptions::default())?;

    let scores = data.get_scores(&[Field::Obs, Field::Fcst], 0, Axis::All, None)?;
    for values in &scores {
        assert_eq!(values.shape(), &[3, 1, 1]);
        assert!(values[[0, 0, 0]].is_nan());
        assert_eq!(values[[1, 0, 0]], 2.0);
        assert!(values[[2, 0, 0]].is_nan());
    }
    Ok(())
}

#[test]
fn test_no_valid_points_gives_nan_placeholder() -> Result<()> {
    let a = series("a", vec![1, 2], vec![f64::NAN, 1.0], vec![1.0, f64::NAN]);
    let data = build(vec![a], AlignOptions::default())?;

    let scores = data.get_scores(&[Field::Obs, Field::Fcst], 0, Axis::No, None)?;
    assert_eq!(scores.len(), 2);
    for values in &scores {
        assert_eq!(values.len(), 1);
        assert!(values[[0]].is_nan());
    }
    Ok(())
}

#[test]
fn test_offset_and_location_axes() -> Result<()> {
    let locations = vec![
        Location::new(10, 59.0, 10.0, 50.0),
        Location::new(20, 61.0, 11.0, 500.0),
    ];
    // values encode (time, offset, location) as t*100 + o*10 + l
    let values: Vec<f64> = (0..2)
        .flat_map(|t| (0..3).flat_map(move |o| (0..2).map(move |l| f64::from(t * 100 + o * 10 + l))))
        .collect();
    let a = MemorySource::new("a", vec![1, 2], vec![0.0, 6.0, 12.0], locations)
        .with_obs(Array3::from_shape_vec((2, 3, 2), values)?);
    let data = build(vec![a], AlignOptions::default())?;

    let offset = data.get_scores(&[Field::Obs], 0, Axis::Offset, Some(1))?;
    assert_eq!(offset[0].as_slice().unwrap(), &[10.0, 11.0, 110.0, 111.0]);

    let location = data.get_scores(&[Field::Obs], 0, Axis::Lat, Some(1))?;
    assert_eq!(
        location[0].as_slice().unwrap(),
        &[1.0, 11.0, 21.0, 101.0, 111.0, 121.0]
    );

    let time = data.get_scores(&[Field::Obs], 0, Axis::Time, Some(1))?;
    assert_eq!(time[0].len(), 6);
    assert_eq!(time[0][[0]], 100.0);

    assert_eq!(data.axis_values(Axis::Elevation), vec![50.0, 500.0]);
    assert_eq!(data.axis_values(Axis::Location), vec![0.0, 1.0]);
    assert_eq!(
        data.axis_description_header(Axis::LocationId, false),
        "    id   lat   lon  elev"
    );
    assert_eq!(
        data.axis_descriptions(Axis::LocationId, false)?[0],
        "    10 59.00 10.00    50"
    );
    assert_eq!(
        data.axis_descriptions(Axis::Elevation, true)?[1],
        "20,61.000000,11.000000,500.000000"
    );
    assert_eq!(data.axis_description_header(Axis::Offset, true), "Offset");
    Ok(())
}

#[test]
fn test_location_filters() -> Result<()> {
    let locations = vec![
        Location::new(1, 59.0, 10.0, 10.0),
        Location::new(2, 62.0, 10.0, 800.0),
        Location::new(3, 70.0, 25.0, 20.0),
    ];
    let make = || {
        MemorySource::new("a", vec![1], vec![0.0], locations.clone())
            .with_obs(Array3::from_shape_vec((1, 1, 3), vec![1.0, 2.0, 3.0]).unwrap())
    };

    let data = build(
        vec![make()],
        AlignOptions {
            lat_range: Some((58.0, 65.0)),
            ..AlignOptions::default()
        },
    )?;
    assert_eq!(data.location_ids(), vec![1, 2]);

    let data = build(
        vec![make()],
        AlignOptions {
            lat_range: Some((58.0, 65.0)),
            elev_range: Some((0.0, 100.0)),
            ..AlignOptions::default()
        },
    )?;
    assert_eq!(data.location_ids(), vec![1]);
    let obs = data.get_scores(&[Field::Obs], 0, Axis::No, None)?;
    assert_eq!(obs[0].as_slice().unwrap(), &[1.0]);

    let data = build(
        vec![make()],
        AlignOptions {
            locations: Some(vec![3, 2]),
            ..AlignOptions::default()
        },
    )?;
    assert_eq!(data.location_ids(), vec![2, 3]);

    let err = build(
        vec![make()],
        AlignOptions {
            lon_range: Some((100.0, 120.0)),
            ..AlignOptions::default()
        },
    )
    .err()
    .expect("empty lat/lon range must fail");
    assert!(err.to_string().contains("lat/lon range"));
    Ok(())
}

#[test]
fn test_thresholds_and_quantiles() -> Result<()> {
    let scores = ndarray::Array4::from_shape_vec((1, 1, 1, 3), vec![0.9, 0.5, 0.1])?;
    let a = series("a", vec![1], vec![1.0], vec![1.0])
        .with_thresholds(vec![0.0, 5.0, 10.0], scores.clone())
        .with_quantiles(vec![0.1, 0.5, 0.9], scores.clone());
    let b = series("b", vec![1], vec![1.0], vec![1.0])
        .with_thresholds(vec![10.0, 5.0, 20.0], scores);
    let data = build(vec![a, b], AlignOptions::default())?;

    assert_eq!(data.thresholds(), &[5.0, 10.0]);
    assert!(data.quantiles().is_empty());

    let a_p5 = data.get_scores(&[Field::Threshold(5.0)], 0, Axis::Threshold, None)?;
    let b_p5 = data.get_scores(&[Field::Threshold(5.0)], 1, Axis::Threshold, None)?;
    assert_eq!(a_p5[0].as_slice().unwrap(), &[0.5]);
    assert_eq!(b_p5[0].as_slice().unwrap(), &[0.5]);

    let err = data
        .get_scores(&[Field::Quantile(0.5)], 0, Axis::No, None)
        .err()
        .expect("b has no quantiles");
    assert!(matches!(err, AlignError::FieldUnavailable { .. }));
    Ok(())
}

#[test]
fn test_unit_conversion_adapter() -> Result<()> {
    let a = series("a", vec![1, 2], vec![0.0, 10.0], vec![1.0, 11.0])
        .with_variable(Variable::new("Temperature", "C"));
    let data = build(
        vec![a],
        AlignOptions {
            obs_adapter: Box::new(UnitConversion {
                field: Field::Obs,
                scale: 1.0,
                offset: 273.15,
                units: "K".to_string(),
            }),
            ..AlignOptions::default()
        },
    )?;

    assert_eq!(data.variable_and_units(), "Temperature (K)");
    assert_eq!(data.axis_label(Axis::Threshold), "Temperature (K)");
    let obs = data.get_scores(&[Field::Obs], 0, Axis::No, None)?;
    let kelvin = obs[0].as_slice().unwrap();
    assert!((kelvin[0] - 273.15).abs() < 1e-9);
    assert!((kelvin[1] - 283.15).abs() < 1e-9);
    let fcst = data.get_scores(&[Field::Fcst], 0, Axis::No, None)?;
    assert_eq!(fcst[0].as_slice().unwrap(), &[1.0, 11.0]);
    Ok(())
}

#[test]
fn test_legend_and_names() -> Result<()> {
    let a = series("raw", vec![1], vec![1.0], vec![1.0]);
    let b = series("kf", vec![1], vec![1.0], vec![1.0]);
    let data = build(vec![a.clone(), b.clone()], AlignOptions::default())?;
    assert_eq!(data.legend(), vec!["raw".to_string(), "kf".to_string()]);

    let data = build(
        vec![a, b],
        AlignOptions {
            legend: Some(vec!["Raw model".to_string(), "Kalman".to_string()]),
            ..AlignOptions::default()
        },
    )?;
    assert_eq!(data.legend()[1], "Kalman");
    assert_eq!(data.names(), vec!["raw".to_string(), "kf".to_string()]);
    Ok(())
}

#[test]
fn test_concurrent_readers_share_one_load() -> Result<()> {
    let a = series("a", vec![1, 2], vec![1.0, 2.0], vec![1.0, 2.0]);
    let b = series("b", vec![1, 2], vec![3.0, 4.0], vec![3.0, 4.0]);
    let data = build(vec![a, b], AlignOptions::default())?;

    let (x, y) = thread::scope(|scope| {
        let first = scope.spawn(|| data.field(Field::Obs, 0));
        let second = scope.spawn(|| data.field(Field::Obs, 0));
        (first.join().unwrap(), second.join().unwrap())
    });
    assert!(Arc::ptr_eq(&x?, &y?));
    assert!(data.is_cached(Field::Obs, 1));
    assert!(!data.is_cached(Field::Fcst, 0));
    Ok(())
}

/// Source whose obs array takes a while to arrive
struct SlowObs {
    inner: MemorySource,
    delay: Duration,
}

impl Source for SlowObs {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn times(&self) -> &[i64] {
        self.inner.times()
    }

    fn offsets(&self) -> &[f64] {
        self.inner.offsets()
    }

    fn locations(&self) -> &[Location] {
        self.inner.locations()
    }

    fn thresholds(&self) -> &[f64] {
        self.inner.thresholds()
    }

    fn quantiles(&self) -> &[f64] {
        self.inner.quantiles()
    }

    fn variable(&self) -> &Variable {
        self.inner.variable()
    }

    fn obs(&self) -> Result<Array3<f64>> {
        thread::sleep(self.delay);
        self.inner.obs()
    }

    fn fcst(&self) -> Result<Array3<f64>> {
        self.inner.fcst()
    }

    fn ensemble(&self) -> Result<ndarray::Array4<f64>> {
        self.inner.ensemble()
    }

    fn threshold_scores(&self) -> Result<ndarray::Array4<f64>> {
        self.inner.threshold_scores()
    }

    fn quantile_scores(&self) -> Result<ndarray::Array4<f64>> {
        self.inner.quantile_scores()
    }

    fn declared_fields(&self) -> Vec<Field> {
        self.inner.declared_fields()
    }
}

#[test]
fn test_pool_and_plain_threads_load_different_fields() -> Result<()> {
    let slow = SlowObs {
        inner: MemorySource::new("slow", vec![1, 2], vec![0.0, 6.0, 12.0], one_location())
            .with_obs(Array3::from_elem((2, 3, 1), 0.2))
            .with_fcst(Array3::from_elem((2, 3, 1), 1.0)),
        delay: Duration::from_millis(300),
    };
    let data = Arc::new(AlignedDataset::build(
        vec![Box::new(slow) as Box<dyn Source>],
        AlignOptions::default(),
    )?);
    let (tx, rx) = mpsc::channel();

    let plain = {
        let data = Arc::clone(&data);
        let tx = tx.clone();
        thread::spawn(move || {
            let window = data.field(Field::ObsWindow, 0).map(|w| w[[0, 0, 0]]);
            let _ = tx.send(window);
        })
    };
    thread::sleep(Duration::from_millis(50));

    let pool_requests = rayon::current_num_threads() * 2;
    for _ in 0..pool_requests {
        let data = Arc::clone(&data);
        let tx = tx.clone();
        rayon::spawn(move || {
            let fcst = data.field(Field::Fcst, 0).map(|f| f[[0, 0, 0]]);
            let _ = tx.send(fcst);
        });
    }
    drop(tx);

    let mut values = Vec::new();
    for _ in 0..=pool_requests {
        let value = rx
            .recv_timeout(Duration::from_secs(10))
            .expect("every request completes");
        values.push(value?);
    }
    plain.join().unwrap();

    assert_eq!(values.iter().filter(|&&v| v == 1.0).count(), pool_requests);
    // 0.2 + 0.2 + 0.2 crosses at the third offset, 12 h ahead
    assert!(values.contains(&12.0));
    assert!(data.is_cached(Field::ObsWindow, 0));
    Ok(())
}

#[test]
fn test_json_source_from_file() -> Result<()> {
    let doc = r#"{
        "name": "raw",
        "times": [100, 200],
        "offsets": [0, 6],
        "locations": [{"id": 18700, "lat": 59.9, "lon": 10.7, "elev": 94}],
        "variable": {"name": "Precip", "units": "mm"},
        "obs": [[[1.0], [null]], [[0.5], [0.25]]],
        "fcst": [[[0.8], [0.3]], [[0.4], [0.2]]]
    }"#;
    let mut file = NamedTempFile::new()?;
    file.write_all(doc.as_bytes())?;

    let source = MemorySource::from_json_path(file.path())?;
    assert_eq!(source.name(), "raw");
    assert_eq!(source.variable().units, "mm");
    let obs = source.obs()?;
    assert_eq!(obs.shape(), &[2, 2, 1]);
    assert!(obs[[0, 1, 0]].is_nan());

    let data = build(vec![source], AlignOptions::default())?;
    let obs = data.get_scores(&[Field::Obs], 0, Axis::Offset, Some(1))?;
    assert_eq!(obs[0].as_slice().unwrap(), &[0.25]);
    Ok(())
}

#[test]
fn test_ragged_json_is_rejected() {
    let doc = r#"{
        "name": "bad",
        "times": [100, 200],
        "offsets": [0],
        "locations": [{"id": 1, "lat": 0, "lon": 0, "elev": 0}],
        "obs": [[[1.0]], [[1.0, 2.0]]]
    }"#;
    assert!(MemorySource::from_json_str(doc).is_err());
}
