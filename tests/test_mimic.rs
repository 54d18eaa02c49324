use approx::assert_relative_eq;
use kinematic_rig::{DescriptorResolver, Error, RobotModel};

fn load(text: &str) -> kinematic_rig::Result<RobotModel> {
    RobotModel::load_str(text, "", &mut DescriptorResolver::new())
}

fn chain_with_mimics(mimics: &[(&str, &str)]) -> String {
    let mut text = String::from(r#"<robot name="m"><link name="l0"/>"#);
    for (i, (joint, mimicked)) in mimics.iter().enumerate() {
        text.push_str(&format!(
            r#"<link name="l{child}"/>
            <joint name="{joint}" type="revolute">
                <parent link="l{i}"/>
                <child link="l{child}"/>
                <mimic joint="{mimicked}"/>
            </joint>"#,
            child = i + 1
        ));
    }
    text.push_str("</robot>");
    text
}

#[test]
fn test_mimic_multiplier_and_offset() {
    let model = load(include_str!("../urdf/hand.urdf")).unwrap();
    assert!(model.set_joint_value("ring_spread", &[0.5]));
    assert_relative_eq!(model.joint_value("pinky_spread"), 1.1, epsilon = 1e-12);
    // 0.9 * 2 + 0.1 is over the upper limit
    assert!(model.set_joint_value("ring_spread", &[0.9]));
    assert_relative_eq!(model.joint_value("pinky_spread"), 1.2);
    assert!(!model.set_joint_value("ring_spread", &[0.9]));
}

#[test]
fn test_mimic_follows_through_distal() {
    let model = load(include_str!("../urdf/hand.urdf")).unwrap();
    assert!(model.set_joint_value("index_pip", &[0.7]));
    assert_relative_eq!(model.joint_value("index_dip"), 0.7);
    // the follower alone can be moved
    assert!(model.set_joint_value("index_dip", &[0.2]));
    assert_relative_eq!(model.joint_value("index_pip"), 0.7);
    // same value for the driver, but the follower changes back
    assert!(model.set_joint_value("index_pip", &[0.7]));
    assert_relative_eq!(model.joint_value("index_dip"), 0.7);
}

#[test]
fn test_mimic_loops() {
    let two = chain_with_mimics(&[("a", "b"), ("b", "a")]);
    match load(&two) {
        Err(Error::InfiniteMimicLoop { joint_name }) => assert_eq!(joint_name, "a"),
        other => panic!("loop expected, got {other:?}"),
    }
    let own = chain_with_mimics(&[("a", "a")]);
    assert!(matches!(load(&own), Err(Error::InfiniteMimicLoop { .. })));
    let three = chain_with_mimics(&[("a", "c"), ("b", "a"), ("c", "b")]);
    assert!(matches!(load(&three), Err(Error::InfiniteMimicLoop { .. })));
}

#[test]
fn test_mimic_chain_without_loop() {
    let text = chain_with_mimics(&[("a", "none"), ("b", "a"), ("c", "b")]);
    let model = load(&text).unwrap();
    assert!(model.set_joint_value("a", &[0.25]));
    assert_relative_eq!(model.joint_value("b"), 0.25);
    assert_relative_eq!(model.joint_value("c"), 0.25);
    assert!(model.joint("a").unwrap().mimic_children().len() == 1);
}
