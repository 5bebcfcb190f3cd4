use std::path::PathBuf;

use schemars::schema::RootSchema;

use icgen::generators::UniformParameters;
use icgen::generators::SphereParameters;


macro_rules! generate_schema {
    ($name: expr, $Type: ty) => {
        save_schema($name, schemars::schema_for!($Type))
    };
}

fn save_schema(name: &str, schema: RootSchema) {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.pop();
    path.push("build");
    path.push("json-schemas");
    std::fs::create_dir_all(&path).expect("failed to create JSON schema directory");

    path.push(format!("{}.json", name));

    let schema = serde_json::to_string_pretty(&schema).expect("failed to create JSON schema");
    std::fs::write(path, schema).expect("failed to save JSON schema to file");
}

fn main() {
    // named after the generators in the registry
    generate_schema!("uniform", UniformParameters);
    generate_schema!("sphere_in_background", SphereParameters);
}
