use approx::assert_relative_eq;

use icgen::generators::{GeneratorBase, UniformBox, UniformParameters};
use icgen::generators::{SphereInBackground, SphereParameters};
use icgen::snapshot::{write_snapshot, ColumnDensity, DEFAULT_EDGES};

#[test]
fn uniform_box() {
    let directory = tempfile::tempdir().unwrap();
    let path = directory.path().join("uniform_ICs.hdf5");

    let dataset = UniformBox::new(UniformParameters {
        box_size: 10.0,
        density: 1.0,
        particle_mass: 0.25,
        velocity: 1.0,
        maxwell_distributed: false,
        seed: 42,
    }).unwrap().generate().unwrap();
    write_snapshot(&dataset, &path).unwrap();

    let density = ColumnDensity::from_file(&path, [5.0, 5.0, 5.0]).unwrap();
    assert_eq!(density.len(), 4000);
    // the mass table is empty, so the first particle mass is used
    assert_eq!(density.mass(), 0.25);

    for axis in 0..3 {
        let map = density.project(10.0, DEFAULT_EDGES, axis, false).unwrap();
        assert_eq!(map.shape(), [200, 200]);

        // all the particles are inside the map
        let bin_area = (10.0 / 200.0) * (10.0 / 200.0);
        assert_relative_eq!(map.sum() * bin_area, 4000.0 * 0.25, max_relative=1e-12);
    }

    // a smaller map only contains part of the particles
    let map = density.project(5.0, 11, 2, false).unwrap();
    let bin_area = 0.5 * 0.5;
    let inside = dataset.coordinates().rows().into_iter().filter(|position| {
        (2.5..=7.5).contains(&position[0]) && (2.5..=7.5).contains(&position[1])
    }).count();
    assert_relative_eq!(map.sum() * bin_area, inside as f64 * 0.25, max_relative=1e-12);

    // the average column density is the mass density times the box size
    let map = density.project(10.0, 11, 2, false).unwrap();
    let mean = map.mean().unwrap();
    assert_relative_eq!(mean, 1.0 * 10.0, max_relative=1e-12);
}

#[test]
fn sphere_log_scale() {
    let directory = tempfile::tempdir().unwrap();
    let path = directory.path().join("sphere_ICs.hdf5");

    let generator = SphereInBackground::new(SphereParameters {
        background_size: 10.0,
        background_density: 0.0,
        sphere_radius: 1.0,
        sphere_particles: 5000,
        sphere_velocity: 1.0,
        seed: 42,
    }).unwrap();
    write_snapshot(&generator.generate().unwrap(), &path).unwrap();

    let density = ColumnDensity::from_file(&path, generator.sphere_center()).unwrap();
    let linear = density.project(4.0, 41, 0, false).unwrap();
    let log = density.project(4.0, 41, 0, true).unwrap();

    for (&linear, &log) in linear.iter().zip(log.iter()) {
        if linear == 0.0 {
            assert_eq!(log, f64::NEG_INFINITY);
        } else {
            assert_relative_eq!(log, linear.log10(), max_relative=1e-12);
        }
    }

    // the sphere projects to a disk of radius 1, the corners are empty
    assert_eq!(linear[[0, 0]], 0.0);
    assert_eq!(linear[[39, 39]], 0.0);
    assert!(linear[[20, 20]] > 0.0);

    // the center of the disk is denser than its edge
    let bin_area = 0.1 * 0.1;
    assert_relative_eq!(linear.sum() * bin_area, 5000.0, max_relative=1e-12);
    assert!(linear[[20, 20]] > linear[[20, 29]]);
}

#[test]
fn default_library_format() {
    let path = "tests/data/generated/snapshot-v0.hdf5";
    let density = ColumnDensity::from_file(path, [1.0, 1.0, 1.0]).unwrap();
    assert_eq!(density.len(), 4);
    // the mass table only contains (integer) zeros, so the first particle
    // mass is used
    assert_eq!(density.mass(), 0.5);

    // bins of size 1 along x and y
    let map = density.project(2.0, 3, 2, false).unwrap();
    assert_eq!(map.shape(), [2, 2]);
    assert_relative_eq!(map[[0, 0]], 2.0 * 0.5);
    assert_relative_eq!(map[[0, 1]], 0.0);
    assert_relative_eq!(map[[1, 0]], 0.5);
    assert_relative_eq!(map[[1, 1]], 0.5);
}
