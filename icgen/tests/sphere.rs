use approx::assert_relative_eq;
use ndarray::s;

use icgen::generators::{GeneratorBase, SphereInBackground, SphereParameters};
use icgen::generators::{UniformBox, UniformParameters};

fn parameters() -> SphereParameters {
    SphereParameters {
        background_size: 10.0,
        background_density: 2.0,
        sphere_radius: 1.5,
        sphere_particles: 20_000,
        sphere_velocity: 0.75,
        seed: 12,
    }
}

fn distance(position: ndarray::ArrayView1<'_, f64>, center: [f64; 3]) -> f64 {
    let dx = position[0] - center[0];
    let dy = position[1] - center[1];
    let dz = position[2] - center[2];
    return f64::sqrt(dx * dx + dy * dy + dz * dz);
}

#[test]
fn reproducibility() {
    let generator = SphereInBackground::new(parameters()).unwrap();
    assert_eq!(generator.generate().unwrap(), generator.generate().unwrap());

    let other = SphereInBackground::new(SphereParameters {
        seed: 13,
        ..parameters()
    }).unwrap();
    assert_ne!(generator.generate().unwrap(), other.generate().unwrap());
}

#[test]
fn containment() {
    let generator = SphereInBackground::new(parameters()).unwrap();
    let dataset = generator.generate().unwrap();
    let n_background = generator.background_particles();
    assert_eq!(n_background, 2000);
    assert_eq!(dataset.len(), 22_000);
    assert_eq!(dataset.box_size(), 20.0);

    let coordinates = dataset.coordinates();
    for position in coordinates.slice(s![..n_background, ..]).rows() {
        assert!(position.iter().all(|&x| (0.0..10.0).contains(&x)));
    }

    let center = generator.sphere_center();
    assert_eq!(center, [5.0, 5.0, 1.5]);
    for position in coordinates.slice(s![n_background.., ..]).rows() {
        assert!(distance(position, center) <= 1.5 * (1.0 + 1e-12));
    }
}

#[test]
fn volumetric_uniformity() {
    let generator = SphereInBackground::new(parameters()).unwrap();
    let dataset = generator.generate().unwrap();
    let n_background = generator.background_particles();
    let center = generator.sphere_center();

    // four shells with the same volume
    let n_shells = 4;
    let mut counts = vec![0_usize; n_shells];
    for position in dataset.coordinates().slice(s![n_background.., ..]).rows() {
        let r = distance(position, center) / 1.5;
        let shell = ((r.powi(3) * n_shells as f64) as usize).min(n_shells - 1);
        counts[shell] += 1;
    }

    let expected = 20_000.0 / n_shells as f64;
    for &count in &counts {
        assert_relative_eq!(count as f64, expected, max_relative=0.07);
    }

    // the center of mass of the sphere is at the center
    let sphere = dataset.coordinates().slice(s![n_background.., ..]).to_owned();
    let center_of_mass = sphere.mean_axis(ndarray::Axis(0)).unwrap();
    for k in 0..3 {
        assert_relative_eq!(center_of_mass[k], center[k], epsilon=0.05);
    }
}

#[test]
fn concatenation_order() {
    let generator = SphereInBackground::new(parameters()).unwrap();
    let dataset = generator.generate().unwrap();
    let n_background = generator.background_particles();

    for (i, &id) in dataset.ids().iter().enumerate() {
        assert_eq!(id, i as i64);
    }
    assert!(dataset.masses().iter().all(|&mass| mass == 1.0));

    let velocities = dataset.velocities();
    assert!(velocities.slice(s![..n_background, ..]).iter().all(|&v| v == 0.0));
    for velocity in velocities.slice(s![n_background.., ..]).rows() {
        assert_eq!(velocity.to_vec(), [0.0, 0.0, 0.75]);
    }

    // the background is drawn first from the random stream, in the same way
    // as a uniform box with the same seed
    let uniform = UniformBox::new(UniformParameters {
        box_size: 10.0,
        density: 2.0,
        particle_mass: 1.0,
        velocity: 0.0,
        maxwell_distributed: false,
        seed: 12,
    }).unwrap().generate().unwrap();

    assert_eq!(uniform.len(), n_background);
    assert_eq!(dataset.coordinates().slice(s![..n_background, ..]), uniform.coordinates());
}

#[test]
fn empty_sphere() {
    let generator = SphereInBackground::new(SphereParameters {
        sphere_particles: 0,
        ..parameters()
    }).unwrap();

    let dataset = generator.generate().unwrap();
    assert_eq!(dataset.len(), 2000);
    assert!(dataset.velocities().iter().all(|&v| v == 0.0));
}
