use kinematic_rig::prelude::*;
use kinematic_rig::CalibrationTable;
use std::collections::BTreeMap;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("kinematic_rig=info".parse()?),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let path = args.next().unwrap_or_else(|| "urdf/hand.urdf".to_owned());
    let mut resolver = DescriptorResolver::new();
    let mut model = UrdfLoader::new()
        .parse_collisions(true)
        .load_file(&path, &mut resolver)?;
    if let Some(calibration_path) = args.next() {
        let text = std::fs::read_to_string(calibration_path)?;
        model.set_calibration_data(CalibrationTable::from_json(&text)?);
    }

    println!("{}", model.robot());
    println!("{} geometries to resolve", resolver.resolved.len());

    let positions = BTreeMap::from([("servo_6", 260.0), ("servo_10", 20.0)]);
    model.set_servo_positions(positions, false, None);
    model.update_transforms();
    for joint in model.robot().iter_joints() {
        let name = joint.name();
        if let Some(world) = model.world_transform(&name) {
            let t = world.translation.vector;
            println!(
                "{name:>16} {:+.3} [{:+.3} {:+.3} {:+.3}]",
                model.joint_value(&name),
                t.x,
                t.y,
                t.z
            );
        }
    }
    println!("{:?}", model.servo_positions());
    Ok(())
}
