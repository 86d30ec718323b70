//! Demostración de extremo a extremo del puente: conexión, CJ, barrido en
//! equivalencia vía lote, estado post-choque y residuos FH/FP.
use log::{info, warn};
use serde_json::to_string_pretty;

use thermoflow_rust::config::CONFIG;
use thermoflow_rust::domain::{Composition, InitialConditions};
use thermoflow_rust::engine::ThermoBridge;
use thermoflow_rust::errors::CoreError;
use thermoflow_rust::validation::ValidationEngine;

const DEMO_MECHANISM: &str = "sandiego20161214_H2only.yaml";
/// Masa molar media de H2:2 O2:1 N2:3.76 [kg/mol].
const H2_AIR_MOLAR_MASS: f64 = 0.020_91;
const GAS_CONSTANT: f64 = 8.314_462;

fn run_demo() -> Result<(), CoreError> {
    let bridge = ThermoBridge::new(CONFIG.bridge.clone());
    if !bridge.test_connection() {
        return Err(CoreError::Config(format!("toolkit no disponible (python={}, script={})",
                                             CONFIG.bridge.python_path,
                                             CONFIG.bridge.bridge_script.display())));
    }

    // Mezcla estándar H2-aire
    let standard = InitialConditions::new(101_325.0, 300.0, "H2:2 O2:1 N2:3.76", DEMO_MECHANISM)?;
    let cj = bridge.calculate_cj_speed(&standard)?;
    println!("[CJ] {standard} -> {cj:.1} m/s");

    // Barrido en razón de equivalencia en una sola petición
    let sweep = [0.6, 0.8, 1.0, 1.2, 1.5].iter()
                                          .map(|&phi| {
                                              let comp = Composition::for_fuel("H2", phi, "air")?;
                                              InitialConditions::from_parts(101_325.0, 300.0, comp, DEMO_MECHANISM)
                                          })
                                          .collect::<Result<Vec<_>, _>>()?;
    let speeds = bridge.calculate_cj_speed_batch(&sweep)?;
    for (ic, speed) in sweep.iter().zip(&speeds) {
        println!("[sweep] {} -> {speed:.1} m/s", ic.composition());
    }

    // Estado post-choque a la velocidad CJ y residuos de conservación
    let post = bridge.calculate_post_shock_eq(cj, &standard)?;
    let rho1 = standard.pressure() * H2_AIR_MOLAR_MASS / (GAS_CONSTANT * standard.temperature());
    match bridge.calculate_equilibrium_state(rho1, standard.temperature(), "H2:2 O2:1 N2:3.76", DEMO_MECHANISM) {
        Ok(pre) => {
            let fhfp = bridge.calculate_fhfp(cj, &pre, &post);
            println!("[FHFP] FH={:.3e} FP={:.3e}", fhfp.enthalpy_error, fhfp.pressure_error);
        }
        Err(e) => warn!("No se pudo calcular el estado inicial: {e}"),
    }
    println!("[post-shock] P={:.0} Pa T={:.1} K rho={:.4} kg/m3",
             post.pressure(),
             post.temperature(),
             post.density());

    if CONFIG.bridge.validation_enabled {
        let report = ValidationEngine::from_config(&CONFIG.bridge).run(&bridge)?;
        println!("[validation] {}/{} ({:.1}%)", report.passed, report.total, report.overall_accuracy);
    }

    if bridge.caching_enabled() {
        bridge.save_cache()?;
    }
    let stats = bridge.telemetry().snapshot();
    println!("[stats] {}", to_string_pretty(&stats).unwrap_or_default());
    info!("Tasa de éxito: {:.1}%", stats.success_rate() * 100.0);
    Ok(())
}

fn main() {
    thermoflow_rust::engine::config::init_dotenv();
    let level = if CONFIG.bridge.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = run_demo() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
