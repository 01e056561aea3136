//! Static parameter schema tables
//!
//! One row per field: internal name, unit-annotated external key, and the
//! documented default. The tables are the single source of truth consulted by
//! compose, validate and (de)serialization. Order is significant: a
//! [`ParameterSet`](super::ParameterSet) stores its values positionally.

/// One schema row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    /// Internal (snake case) field name
    pub name: &'static str,
    /// Externally documented key, annotated with its physical unit
    pub key: &'static str,
    /// Value used when neither overrides nor saved parameters provide one
    pub default: f64,
}

impl FieldSpec {
    const fn new(name: &'static str, key: &'static str, default: f64) -> Self {
        Self { name, key, default }
    }
}

/// Baseline (non-degradation) electrochemical and thermal parameters.
#[allow(clippy::unreadable_literal)]
#[rustfmt::skip]
pub static BASELINE_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("negative_current_collector_thickness", "Negative current collector thickness [m]", 1.2e-05),
    FieldSpec::new("negative_electrode_thickness", "Negative electrode thickness [m]", 8.52e-05),
    FieldSpec::new("separator_thickness", "Separator thickness [m]", 1.2e-05),
    FieldSpec::new("positive_electrode_thickness", "Positive electrode thickness [m]", 7.56e-05),
    FieldSpec::new("positive_current_collector_thickness", "Positive current collector thickness [m]", 1.6e-05),
    FieldSpec::new("electrode_height", "Electrode height [m]", 0.065),
    FieldSpec::new("electrode_width", "Electrode width [m]", 1.58),
    FieldSpec::new("cell_cooling_surface_area", "Cell cooling surface area [m2]", 0.00531),
    FieldSpec::new("cell_volume", "Cell volume [m3]", 2.42e-05),
    FieldSpec::new("cell_thermal_expansion_coefficient", "Cell thermal expansion coefficient [m.K-1]", 1.1e-06),
    FieldSpec::new("negative_current_collector_conductivity", "Negative current collector conductivity [S.m-1]", 58411000.0),
    FieldSpec::new("positive_current_collector_conductivity", "Positive current collector conductivity [S.m-1]", 36914000.0),
    FieldSpec::new("negative_current_collector_density", "Negative current collector density [kg.m-3]", 8960.0),
    FieldSpec::new("positive_current_collector_density", "Positive current collector density [kg.m-3]", 2700.0),
    FieldSpec::new("negative_current_collector_specific_heat_capacity", "Negative current collector specific heat capacity [J.kg-1.K-1]", 385.0),
    FieldSpec::new("positive_current_collector_specific_heat_capacity", "Positive current collector specific heat capacity [J.kg-1.K-1]", 897.0),
    FieldSpec::new("negative_current_collector_thermal_conductivity", "Negative current collector thermal conductivity [W.m-1.K-1]", 401.0),
    FieldSpec::new("positive_current_collector_thermal_conductivity", "Positive current collector thermal conductivity [W.m-1.K-1]", 237.0),
    FieldSpec::new("nominal_cell_capacity", "Nominal cell capacity [A.h]", 5.0),
    FieldSpec::new("current_function", "Current function [A]", 5.0),
    FieldSpec::new("contact_resistance", "Contact resistance [Ohm]", 0.0),
    FieldSpec::new("negative_electrode_conductivity", "Negative electrode conductivity [S.m-1]", 215.0),
    FieldSpec::new("maximum_concentration_in_negative_electrode", "Maximum concentration in negative electrode [mol.m-3]", 33133.0),
    FieldSpec::new("negative_electrode_porosity", "Negative electrode porosity", 0.25),
    FieldSpec::new("negative_electrode_active_material_volume_fraction", "Negative electrode active material volume fraction", 0.75),
    FieldSpec::new("negative_particle_radius", "Negative particle radius [m]", 5.86e-06),
    FieldSpec::new("negative_electrode_bruggeman_coefficient_electrolyte", "Negative electrode Bruggeman coefficient (electrolyte)", 1.5),
    FieldSpec::new("negative_electrode_bruggeman_coefficient_electrode", "Negative electrode Bruggeman coefficient (electrode)", 1.5),
    FieldSpec::new("negative_electrode_charge_transfer_coefficient", "Negative electrode charge transfer coefficient", 0.5),
    FieldSpec::new("negative_electrode_double_layer_capacity", "Negative electrode double-layer capacity [F.m-2]", 0.2),
    FieldSpec::new("negative_electrode_density", "Negative electrode density [kg.m-3]", 1657.0),
    FieldSpec::new("negative_electrode_specific_heat_capacity", "Negative electrode specific heat capacity [J.kg-1.K-1]", 700.0),
    FieldSpec::new("negative_electrode_thermal_conductivity", "Negative electrode thermal conductivity [W.m-1.K-1]", 1.7),
    FieldSpec::new("negative_electrode_ocp_entropic_change", "Negative electrode OCP entropic change [V.K-1]", 0.0),
    FieldSpec::new("positive_electrode_conductivity", "Positive electrode conductivity [S.m-1]", 0.18),
    FieldSpec::new("maximum_concentration_in_positive_electrode", "Maximum concentration in positive electrode [mol.m-3]", 63104.0),
    FieldSpec::new("positive_electrode_porosity", "Positive electrode porosity", 0.335),
    FieldSpec::new("positive_particle_radius", "Positive particle radius [m]", 5.22e-06),
    FieldSpec::new("positive_electrode_bruggeman_coefficient_electrolyte", "Positive electrode Bruggeman coefficient (electrolyte)", 1.5),
    FieldSpec::new("positive_electrode_bruggeman_coefficient_electrode", "Positive electrode Bruggeman coefficient (electrode)", 1.5),
    FieldSpec::new("positive_electrode_charge_transfer_coefficient", "Positive electrode charge transfer coefficient", 0.5),
    FieldSpec::new("positive_electrode_double_layer_capacity", "Positive electrode double-layer capacity [F.m-2]", 0.2),
    FieldSpec::new("positive_electrode_density", "Positive electrode density [kg.m-3]", 3262.0),
    FieldSpec::new("positive_electrode_specific_heat_capacity", "Positive electrode specific heat capacity [J.kg-1.K-1]", 700.0),
    FieldSpec::new("positive_electrode_thermal_conductivity", "Positive electrode thermal conductivity [W.m-1.K-1]", 2.1),
    FieldSpec::new("separator_porosity", "Separator porosity", 0.47),
    FieldSpec::new("separator_bruggeman_coefficient_electrolyte", "Separator Bruggeman coefficient (electrolyte)", 1.5),
    FieldSpec::new("separator_density", "Separator density [kg.m-3]", 397.0),
    FieldSpec::new("separator_specific_heat_capacity", "Separator specific heat capacity [J.kg-1.K-1]", 700.0),
    FieldSpec::new("separator_thermal_conductivity", "Separator thermal conductivity [W.m-1.K-1]", 0.16),
    FieldSpec::new("initial_concentration_in_electrolyte", "Initial concentration in electrolyte [mol.m-3]", 1000.0),
    FieldSpec::new("cation_transference_number", "Cation transference number", 0.2594),
    FieldSpec::new("thermodynamic_factor", "Thermodynamic factor", 1.0),
    FieldSpec::new("reference_temperature", "Reference temperature [K]", 298.15),
    FieldSpec::new("total_heat_transfer_coefficient", "Total heat transfer coefficient [W.m-2.K-1]", 10.0),
    FieldSpec::new("ambient_temperature", "Ambient temperature [K]", 298.15),
    FieldSpec::new("number_of_electrodes_connected_in_parallel_to_make_a_cell", "Number of electrodes connected in parallel to make a cell", 1.0),
    FieldSpec::new("number_of_cells_connected_in_series_to_make_a_battery", "Number of cells connected in series to make a battery", 1.0),
    FieldSpec::new("lower_voltage_cut_off", "Lower voltage cut-off [V]", 2.5),
    FieldSpec::new("upper_voltage_cut_off", "Upper voltage cut-off [V]", 4.2),
    FieldSpec::new("open_circuit_voltage_at_0_soc", "Open-circuit voltage at 0% SOC [V]", 2.5),
    FieldSpec::new("open_circuit_voltage_at_100_soc", "Open-circuit voltage at 100% SOC [V]", 4.2),
    FieldSpec::new("initial_concentration_in_negative_electrode", "Initial concentration in negative electrode [mol.m-3]", 29866.0),
    FieldSpec::new("initial_concentration_in_positive_electrode", "Initial concentration in positive electrode [mol.m-3]", 17038.0),
    FieldSpec::new("initial_temperature", "Initial temperature [K]", 298.15),
];

/// Degradation overlay: plating, loss of active material, cracking and swelling.
#[allow(clippy::unreadable_literal)]
#[rustfmt::skip]
pub static DEGRADATION_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("dead_lithium_decay_constant", "Dead lithium decay constant [s-1]", 1e-06),
    FieldSpec::new("initial_plated_lithium_concentration", "Initial plated lithium concentration [mol.m-3]", 0.0),
    FieldSpec::new("lithium_metal_partial_molar_volume", "Lithium metal partial molar volume [m3.mol-1]", 1.3e-05),
    FieldSpec::new("lithium_plating_kinetic_rate_constant", "Lithium plating kinetic rate constant [m.s-1]", 1e-09),
    FieldSpec::new("lithium_plating_transfer_coefficient", "Lithium plating transfer coefficient", 0.65),
    FieldSpec::new("negative_electrode_lam_constant_exponential_term", "Negative electrode LAM constant exponential term", 2.0),
    FieldSpec::new("negative_electrode_lam_constant_proportional_term", "Negative electrode LAM constant proportional term [s-1]", 2.7778e-07),
    FieldSpec::new("negative_electrode_paris_law_constant_b", "Negative electrode Paris' law constant b", 1.12),
    FieldSpec::new("negative_electrode_paris_law_constant_m", "Negative electrode Paris' law constant m", 2.2),
    FieldSpec::new("negative_electrode_poissons_ratio", "Negative electrode Poisson's ratio", 0.3),
    FieldSpec::new("negative_electrode_youngs_modulus", "Negative electrode Young's modulus [Pa]", 15000000000.0),
    FieldSpec::new("negative_electrode_critical_stress", "Negative electrode critical stress [Pa]", 60000000.0),
    FieldSpec::new("negative_electrode_initial_crack_length", "Negative electrode initial crack length [m]", 2e-08),
    FieldSpec::new("negative_electrode_initial_crack_width", "Negative electrode initial crack width [m]", 1.5e-08),
    FieldSpec::new("negative_electrode_number_of_cracks_per_unit_area", "Negative electrode number of cracks per unit area [m-2]", 3180000000000000.0),
    FieldSpec::new("negative_electrode_partial_molar_volume", "Negative electrode partial molar volume [m3.mol-1]", 3.1e-06),
    FieldSpec::new("negative_electrode_reference_concentration_for_free_of_deformation", "Negative electrode reference concentration for free of deformation [mol.m-3]", 0.0),
    FieldSpec::new("positive_electrode_lam_constant_exponential_term", "Positive electrode LAM constant exponential term", 2.0),
    FieldSpec::new("positive_electrode_lam_constant_proportional_term", "Positive electrode LAM constant proportional term [s-1]", 2.7778e-07),
    FieldSpec::new("positive_electrode_ocp_entropic_change", "Positive electrode OCP entropic change [V.K-1]", 0.0),
    FieldSpec::new("positive_electrode_paris_law_constant_b", "Positive electrode Paris' law constant b", 1.12),
    FieldSpec::new("positive_electrode_paris_law_constant_m", "Positive electrode Paris' law constant m", 2.2),
    FieldSpec::new("positive_electrode_poissons_ratio", "Positive electrode Poisson's ratio", 0.2),
    FieldSpec::new("positive_electrode_youngs_modulus", "Positive electrode Young's modulus [Pa]", 375000000000.0),
    FieldSpec::new("positive_electrode_active_material_volume_fraction", "Positive electrode active material volume fraction", 0.665),
    FieldSpec::new("positive_electrode_critical_stress", "Positive electrode critical stress [Pa]", 375000000.0),
    FieldSpec::new("positive_electrode_initial_crack_length", "Positive electrode initial crack length [m]", 2e-08),
    FieldSpec::new("positive_electrode_initial_crack_width", "Positive electrode initial crack width [m]", 1.5e-08),
    FieldSpec::new("positive_electrode_number_of_cracks_per_unit_area", "Positive electrode number of cracks per unit area [m-2]", 3180000000000000.0),
    FieldSpec::new("positive_electrode_partial_molar_volume", "Positive electrode partial molar volume [m3.mol-1]", 1.25e-05),
    FieldSpec::new("positive_electrode_reference_concentration_for_free_of_deformation", "Positive electrode reference concentration for free of deformation [mol.m-3]", 0.0),
    FieldSpec::new("typical_plated_lithium_concentration", "Typical plated lithium concentration [mol.m-3]", 1000.0),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn assert_unique(fields: &[FieldSpec]) {
        let names: HashSet<_> = fields.iter().map(|f| f.name).collect();
        let keys: HashSet<_> = fields.iter().map(|f| f.key).collect();
        assert_eq!(names.len(), fields.len(), "duplicate internal name");
        assert_eq!(keys.len(), fields.len(), "duplicate external key");
    }

    #[test]
    fn test_tables_are_one_to_one() {
        assert_unique(BASELINE_FIELDS);
        assert_unique(DEGRADATION_FIELDS);
    }

    #[test]
    fn test_tables_are_disjoint() {
        let baseline: HashSet<_> = BASELINE_FIELDS.iter().map(|f| f.key).collect();
        assert!(DEGRADATION_FIELDS.iter().all(|f| !baseline.contains(f.key)));
    }

    #[test]
    fn test_defaults_are_valid() {
        for field in BASELINE_FIELDS.iter().chain(DEGRADATION_FIELDS) {
            assert!(field.default.is_finite() && field.default >= 0.0, "{}", field.name);
        }
    }

    #[test]
    fn test_table_sizes() {
        assert_eq!(BASELINE_FIELDS.len(), 65);
        assert_eq!(DEGRADATION_FIELDS.len(), 32);
    }
}
