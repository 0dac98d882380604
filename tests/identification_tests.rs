//! End-to-end identification on noiseless synthetic systems.
//!
//! ## Test Organization
//!
//! 1. **Recovery** - literal NARX formulas are reproduced from their data
//! 2. **Determinism** - repeated runs select the same terms in the same order
//! 3. **Dictionary** - generated candidate sets never contain duplicates
//! 4. **Solvers** - recursive and ordinary least squares agree

use approx::assert_relative_eq;

use arbo_narx::data::sample::{simulate_siso, uniform_noise};
use arbo_narx::dictionary::build_dictionary;
use arbo_narx::domain::{Criterion, Dataset, DictionaryConfig, IdentConfig, Nonlinearity, SearchConfig, Solver};
use arbo_narx::report::{format_model, format_search_summary};
use arbo_narx::{identify, Identification};

// y[k] = 0.2 x[k] + 0.3 x[k-1]^3 + 0.7 |x[k-2]*x[k-1]| + 0.5 exp(x[k-1]*x[k-2]) - 0.3 y[k-1]
fn operator_system(seed: u64) -> Dataset {
    let x = uniform_noise(400, -1.0, 1.0, seed).unwrap();
    simulate_siso(x, 2, |k, x, y| {
        0.2 * x[k] + 0.3 * x[k - 1].powi(3) + 0.7 * (x[k - 2] * x[k - 1]).abs() + 0.5 * (x[k - 1] * x[k - 2]).exp()
            - 0.3 * y[k - 1]
    })
    .unwrap()
}

fn operator_config() -> IdentConfig {
    IdentConfig {
        dictionary: DictionaryConfig {
            input_lags: 2,
            output_lags: 1,
            degree: 3,
            operators: vec![Nonlinearity::Abs, Nonlinearity::Exp],
            operator_degree: 2,
            ..DictionaryConfig::default()
        },
        search: SearchConfig {
            rho: 1e-12,
            max_terms: 30,
            max_depth: 2,
            ..SearchConfig::default()
        },
        ..IdentConfig::default()
    }
}

fn coefficient(run: &Identification, name: &str) -> f64 {
    run.fit
        .model
        .coefficient(name)
        .unwrap_or_else(|| panic!("term {name} not selected: {:?}", run.fit.model.terms))
}

// ============================================================================
// Recovery
// ============================================================================

#[test]
fn test_operator_system_is_recovered() {
    let ds = operator_system(42);
    let run = identify(&ds, 0, &operator_config()).unwrap();

    assert_relative_eq!(coefficient(&run, "x[k]"), 0.2, epsilon = 1e-6);
    assert_relative_eq!(coefficient(&run, "x[k-1]^3"), 0.3, epsilon = 1e-6);
    assert_relative_eq!(coefficient(&run, "abs(x[k-1]*x[k-2])"), 0.7, epsilon = 1e-6);
    assert_relative_eq!(coefficient(&run, "exp(x[k-1]*x[k-2])"), 0.5, epsilon = 1e-6);
    assert_relative_eq!(coefficient(&run, "y[k-1]"), -0.3, epsilon = 1e-6);

    assert!(run.fit.model.terms.len() <= run.fit.summary.root_terms);
    assert!(run.fit.model.quality.rmse < 1e-8);
}

#[test]
fn test_free_run_simulation_tracks_data() {
    let ds = operator_system(7);
    let run = identify(&ds, 0, &operator_config()).unwrap();
    let sim = run.fit.model.simulate(&ds).unwrap();
    for (s, y) in sim.iter().zip(ds.outputs()[0].values.iter()) {
        assert_relative_eq!(*s, *y, epsilon = 1e-6);
    }
}

#[test]
fn test_arx_system_with_every_criterion() {
    let x = uniform_noise(200, -1.0, 1.0, 3).unwrap();
    let ds = simulate_siso(x, 2, |k, x, y| 1.2 * y[k - 1] - 0.5 * y[k - 2] + 0.4 * x[k - 1]).unwrap();

    for criterion in [Criterion::Bic, Criterion::Aic, Criterion::Shortest] {
        let config = IdentConfig {
            dictionary: DictionaryConfig {
                degree: 1,
                ..DictionaryConfig::default()
            },
            search: SearchConfig {
                rho: 1e-12,
                criterion,
                ..SearchConfig::default()
            },
            ..IdentConfig::default()
        };
        let run = identify(&ds, 0, &config).unwrap();
        assert_eq!(run.fit.model.terms.len(), 3, "{criterion:?}");
        assert_relative_eq!(coefficient(&run, "y[k-1]"), 1.2, epsilon = 1e-8);
        assert_relative_eq!(coefficient(&run, "y[k-2]"), -0.5, epsilon = 1e-8);
        assert_relative_eq!(coefficient(&run, "x[k-1]"), 0.4, epsilon = 1e-8);
        assert!(run.fit.model.is_linear());
    }
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn test_repeated_runs_are_identical() {
    let ds = operator_system(99);
    let config = operator_config();
    let a = identify(&ds, 0, &config).unwrap();
    let b = identify(&ds, 0, &config).unwrap();

    assert_eq!(a.fit.indices, b.fit.indices);
    assert_eq!(a.fit.summary, b.fit.summary);
    assert_eq!(a.fit.model.coefficients, b.fit.model.coefficients);
    assert_eq!(format_model(&a.fit.model), format_model(&b.fit.model));
    assert_eq!(
        format_search_summary(&a.fit.summary, &a.fit.model.quality),
        format_search_summary(&b.fit.summary, &b.fit.model.quality)
    );
}

// ============================================================================
// Dictionary
// ============================================================================

#[test]
fn test_dictionaries_have_no_duplicate_terms() {
    let ds = operator_system(1);
    let configs = [
        DictionaryConfig::default(),
        operator_config().dictionary,
        DictionaryConfig {
            operators: vec![Nonlinearity::Abs, Nonlinearity::Abs, Nonlinearity::Identity, Nonlinearity::Cos],
            operator_degree: 3,
            degree: 3,
            ..DictionaryConfig::default()
        },
    ];
    for config in &configs {
        let dict = build_dictionary(&ds, config).unwrap();
        let mut names: Vec<&str> = dict.names();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
    }
}

// ============================================================================
// Solvers
// ============================================================================

#[test]
fn test_recursive_solver_matches_ordinary() {
    let ds = operator_system(5);
    let ordinary = identify(&ds, 0, &operator_config()).unwrap();

    let mut config = operator_config();
    config.solver = Solver::Recursive {
        forgetting: 1.0,
        initial_covariance: 1e8,
    };
    let recursive = identify(&ds, 0, &config).unwrap();

    assert_eq!(ordinary.fit.indices, recursive.fit.indices);
    for (a, b) in ordinary
        .fit
        .model
        .coefficients
        .iter()
        .zip(recursive.fit.model.coefficients.iter())
    {
        assert_relative_eq!(*a, *b, epsilon = 1e-4);
    }
}
