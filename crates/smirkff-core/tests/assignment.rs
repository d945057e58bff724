use smirkff::core::forcefield::params::ForceField;
use smirkff::core::models::atom::Atom;
use smirkff::core::models::element::Element;
use smirkff::core::models::topology::{Bond, BondOrder, Topology};
use smirkff::engine::assignment::ParameterAssignment;
use smirkff::engine::config::{AssignmentConfigBuilder, HandlerSelection};
use smirkff::engine::context::AssignmentContext;
use smirkff::engine::error::AssignError;
use smirkff::engine::progress::ProgressReporter;
use smirkff::workflows::assign;
use std::fs;
use tempfile::tempdir;

const ETHANE_FF: &str = r#"
version = "0.3"

[[handlers]]
type = "Bonds"
units = { length = "angstrom", energy = "kcal/mol" }
[[handlers.rules]]
id = "b1"
smirks = "[#6:1]-[#6:2]"
length = 1.5
k = 300.0
[[handlers.rules]]
id = "b2"
smirks = "[#6:1]-[#1:2]"
length = 1.09
k = 340.0

[[handlers]]
type = "Angles"
units = { angle = "degree", energy = "kcal/mol" }
[[handlers.rules]]
id = "a1"
smirks = "[*:1]~[#6:2]~[*:3]"
angle = 109.5
k = 50.0
[[handlers.rules]]
id = "a2"
smirks = "[#1:1]-[#6:2]-[#1:3]"
angle = 107.8
k = 35.0

[[handlers]]
type = "ProperTorsions"
units = { angle = "degree", energy = "kcal/mol" }
[[handlers.rules]]
id = "t1"
smirks = "[*:1]~[#6:2]-[#6:3]~[*:4]"
periodicity = [3]
phase = [0.0]
k = [0.15]

[[handlers]]
type = "vdW"
units = { length = "angstrom", energy = "kcal/mol" }
[[handlers.rules]]
id = "n1"
smirks = "[#1:1]"
epsilon = 0.0157
rmin-half = 1.487
[[handlers.rules]]
id = "n2"
smirks = "[#6:1]"
epsilon = 0.1094
rmin-half = 1.908

[[handlers]]
type = "Electrostatics"
"#;

/// Ethane with explicit hydrogens: C0 carries H2..H4, C1 carries H5..H7.
fn ethane() -> Topology {
    let mut atoms = vec![Atom::new(Element::C), Atom::new(Element::C)];
    atoms.extend((0..6).map(|_| Atom::new(Element::H)));
    let mut bonds = vec![Bond::new(0, 1, BondOrder::Single)];
    bonds.extend((2..5).map(|h| Bond::new(0, h, BondOrder::Single)));
    bonds.extend((5..8).map(|h| Bond::new(1, h, BondOrder::Single)));
    Topology::new(atoms, bonds).unwrap()
}

/// A chain of `n` carbons with implicit hydrogens.
fn alkane(n: usize) -> Topology {
    let atoms = (0..n)
        .map(|i| {
            let hydrogens = if i == 0 || i == n - 1 { 3 } else { 2 };
            Atom::new(Element::C).with_implicit_hydrogens(hydrogens)
        })
        .collect();
    let bonds = (0..n - 1)
        .map(|i| Bond::new(i, i + 1, BondOrder::Single))
        .collect();
    Topology::new(atoms, bonds).unwrap()
}

fn assign_with(topology: &Topology, forcefield: &ForceField) -> ParameterAssignment {
    let reporter = ProgressReporter::new();
    let selection = HandlerSelection::All;
    let context = AssignmentContext::new(topology, forcefield, &reporter, &selection);
    assign::assign_parameters(&context).unwrap()
}

#[test]
fn ethane_carbon_bond_takes_the_declared_parameters() {
    let topology = ethane();
    let ff = ForceField::from_toml_str(ETHANE_FF).unwrap();
    let assignment = assign_with(&topology, &ff);

    let cc = assignment.bond(1, 0).unwrap();
    assert_eq!(cc.rule_id, "b1");
    assert_eq!(cc.params.length, 1.5);
    assert_eq!(cc.params.k, 300.0);

    assert_eq!(assignment.bonds.len(), 7);
    assert!(assignment.bonds.iter().skip(1).all(|b| b.rule_id == "b2"));
    assert_eq!(assignment.angles.len(), 12);
    assert_eq!(assignment.proper_torsions.len(), 9);
    assert_eq!(assignment.vdw.len(), 8);
    assert!(assignment.improper_torsions.is_empty());
}

#[test]
fn later_rules_win_over_earlier_ones() {
    let topology = ethane();
    let ff = ForceField::from_toml_str(ETHANE_FF).unwrap();
    let assignment = assign_with(&topology, &ff);

    assert_eq!(assignment.angle(2, 0, 3).unwrap().rule_id, "a2");
    assert_eq!(assignment.angle(2, 0, 3).unwrap().params.angle, 107.8);
    assert_eq!(assignment.angle(1, 0, 2).unwrap().rule_id, "a1");
    assert_eq!(assignment.vdw_of(0).unwrap().rule_id, "n2");
    assert_eq!(assignment.vdw_of(7).unwrap().rule_id, "n1");
}

#[test]
fn kekule_benzene_bonds_resolve_as_aromatic() {
    let atoms: Vec<Atom> = (0..6)
        .map(|_| Atom::new(Element::C).aromatic().with_implicit_hydrogens(1))
        .collect();
    let bonds: Vec<Bond> = (0..6)
        .map(|i| {
            let order = if i % 2 == 0 {
                BondOrder::Double
            } else {
                BondOrder::Single
            };
            Bond::new(i, (i + 1) % 6, order).aromatic()
        })
        .collect();
    let topology = Topology::new(atoms, bonds).unwrap();
    let ff = ForceField::from_toml_str(
        r#"
        version = "0.3"
        [[handlers]]
        type = "Bonds"
        units = { length = "angstrom", energy = "kcal/mol" }
        [[handlers.rules]]
        id = "single"
        smirks = "[#6X3:1]-[#6X3:2]"
        length = 1.47
        k = 400.0
        [[handlers.rules]]
        id = "aromatic"
        smirks = "[#6X3:1]:[#6X3:2]"
        length = 1.39
        k = 470.0
        [[handlers.rules]]
        id = "double"
        smirks = "[#6X3:1]=[#6X3:2]"
        length = 1.34
        k = 570.0
        "#,
    )
    .unwrap();

    let assignment = assign_with(&topology, &ff);
    let winners: Vec<&str> = (0..6)
        .map(|i| assignment.bond(i, (i + 1) % 6).unwrap().rule_id.as_str())
        .collect();
    assert_eq!(winners, vec!["aromatic"; 6]);
}

#[test]
fn assignment_is_deterministic() {
    let topology = ethane();
    let ff = ForceField::from_toml_str(ETHANE_FF).unwrap();
    let first = assign_with(&topology, &ff);
    for _ in 0..5 {
        assert_eq!(assign_with(&topology, &ff), first);
    }
    assert!(first.bonds.windows(2).all(|w| w[0].atoms < w[1].atoms));
    assert!(first.angles.windows(2).all(|w| w[0].atoms < w[1].atoms));
}

#[test]
fn merged_documents_extend_the_cascade() {
    let dir = tempdir().unwrap();
    let base = dir.path().join("base.toml");
    let patch = dir.path().join("patch.toml");
    fs::write(&base, ETHANE_FF).unwrap();
    fs::write(
        &patch,
        r#"
        version = "0.3"
        [[handlers]]
        type = "Bonds"
        units = { length = "angstrom", energy = "kcal/mol" }
        [[handlers.rules]]
        id = "b-ethane"
        smirks = "[#6X4:1]-[#6X4:2]"
        length = 1.53
        k = 310.0
        "#,
    )
    .unwrap();

    let config = AssignmentConfigBuilder::new()
        .forcefield_paths(vec![base.clone(), patch.clone()])
        .build()
        .unwrap();
    let assignment = assign::run(&ethane(), &config, &ProgressReporter::new()).unwrap();
    let cc = assignment.bond(0, 1).unwrap();
    assert_eq!(cc.rule_id, "b-ethane");
    assert_eq!(cc.params.length, 1.53);
    assert_eq!(assignment.bond(0, 2).unwrap().rule_id, "b2");

    let reversed = AssignmentConfigBuilder::new()
        .forcefield_paths(vec![patch, base])
        .build()
        .unwrap();
    let assignment = assign::run(&ethane(), &reversed, &ProgressReporter::new()).unwrap();
    assert_eq!(assignment.bond(0, 1).unwrap().rule_id, "b1");
}

#[test]
fn pair_scales_depend_on_bond_distance() {
    let topology = ethane();
    let ff = ForceField::from_toml_str(ETHANE_FF).unwrap();
    let assignment = assign_with(&topology, &ff);

    assert_eq!(assignment.vdw_scale(2, 5), Some(0.5));
    assert!((assignment.electrostatics_scale(2, 5).unwrap() - 1.0 / 1.2).abs() < 1e-9);
    assert_eq!(assignment.vdw_scale(0, 1), Some(0.0));
    assert_eq!(assignment.vdw_scale(2, 1), Some(0.0));

    let chain = alkane(8);
    let ff = ForceField::from_toml_str(
        r#"
        version = "0.3"
        [[handlers]]
        type = "vdW"
        scale14 = 0.25
        units = { length = "angstrom", energy = "kcal/mol" }
        [[handlers.rules]]
        id = "c"
        smirks = "[#6:1]"
        epsilon = 0.1
        sigma = 3.4
        "#,
    )
    .unwrap();
    let assignment = assign_with(&chain, &ff);
    assert_eq!(assignment.vdw_scale(0, 3), Some(0.25));
    assert_eq!(assignment.vdw_scale(0, 6), Some(1.0));
    assert_eq!(assignment.vdw_scale(0, 7), Some(1.0));
    assert_eq!(assignment.electrostatics_scale(0, 3), None);
}

#[test]
fn missing_vdw_coverage_names_the_atom() {
    let atoms = vec![
        Atom::new(Element::C).with_implicit_hydrogens(3).with_name("C1"),
        Atom::new(Element::CL).with_name("CL1"),
    ];
    let topology = Topology::new(atoms, vec![Bond::new(0, 1, BondOrder::Single)]).unwrap();
    let ff = ForceField::from_toml_str(
        r#"
        version = "0.3"
        [[handlers]]
        type = "vdW"
        units = { length = "angstrom", energy = "kcal/mol" }
        [[handlers.rules]]
        id = "c"
        smirks = "[#6:1]"
        epsilon = 0.1
        sigma = 3.4
        "#,
    )
    .unwrap();
    let reporter = ProgressReporter::new();
    let selection = HandlerSelection::All;
    let context = AssignmentContext::new(&topology, &ff, &reporter, &selection);

    let err = assign::assign_parameters(&context).unwrap_err();
    match &err {
        AssignError::Coverage { atoms, .. } => assert_eq!(atoms, &vec![1]),
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("CL1(1)"));

    let lenient = assign::assign_parameters(&context.with_coverage(false)).unwrap();
    assert_eq!(lenient.vdw.len(), 1);
}

#[test]
fn serialized_forcefield_assigns_identically() {
    let topology = ethane();
    let ff = ForceField::from_toml_str(ETHANE_FF).unwrap();
    let text = ff.to_toml_string().unwrap();
    let reparsed = ForceField::from_toml_str(&text).unwrap();

    assert_eq!(assign_with(&topology, &reparsed), assign_with(&topology, &ff));
}

#[test]
fn assignment_exports_to_csv_and_toml() {
    let topology = ethane();
    let ff = ForceField::from_toml_str(ETHANE_FF).unwrap();
    let assignment = assign_with(&topology, &ff);

    let mut csv = Vec::new();
    assignment.write_csv(&mut csv).unwrap();
    let csv = String::from_utf8(csv).unwrap();
    assert!(csv.starts_with("handler,atoms,rule_id,parameters"));
    assert!(csv.contains("0-1,b1,"));

    let toml = assignment.to_toml_string().unwrap();
    assert!(toml.contains("rule_id = \"t1\""));
}
