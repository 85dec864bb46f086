//! Multi-view injector tests.

mod common;
use common::textured_image;

use multiview_augment::{
    build_pipeline, init_worker_rng, AugmentError, MultiViewInjector, Pipeline, Transform,
};

use anyhow::Result;
use tch::{Kind, Tensor};

fn train_views(n: usize, size: u32) -> Result<MultiViewInjector> {
    let pipelines = (0..n)
        .map(|_| build_pipeline("train", size, 1.0, 0.2))
        .collect::<Result<Vec<Pipeline>>>()?;
    MultiViewInjector::new(pipelines)
}

#[test]
fn test_leading_dim_equals_pipeline_count() -> Result<()> {
    init_worker_rng(0, 0, 31);
    let image = textured_image(80, 60);

    for n in 1..=4 {
        let injector = train_views(n, 32)?;
        let views = injector.apply(image.clone())?;
        assert_eq!(views.size(), vec![n as i64, 3, 32, 32]);
        assert_eq!(injector.num_views(), n);
    }
    Ok(())
}

#[test]
fn test_views_are_independent_draws() -> Result<()> {
    init_worker_rng(0, 0, 4);
    let injector = train_views(2, 32)?;
    let views = injector.apply(textured_image(80, 60))?;
    assert!(!views.get(0).equal(&views.get(1)));
    Ok(())
}

#[test]
fn test_deterministic_views_follow_pipeline_order() -> Result<()> {
    let image = textured_image(90, 70);
    let small = build_pipeline("test", 16, 1.0, 0.0)?;
    let injector = MultiViewInjector::new(vec![
        build_pipeline("test", 16, 1.0, 0.0)?,
        build_pipeline("test", 16, 1.0, 0.0)?,
    ])?;

    let views = injector.apply(image.clone())?;
    let expected = small.apply(image)?;
    assert!(views.get(0).equal(&expected));
    assert!(views.get(1).equal(&expected));
    Ok(())
}

#[test]
fn test_source_image_is_untouched() -> Result<()> {
    let image = textured_image(40, 40);
    let snapshot = image.as_bytes().to_vec();

    let injector = train_views(3, 16)?;
    injector.apply(image.clone())?;
    assert_eq!(image.as_bytes(), snapshot.as_slice());
    Ok(())
}

#[test]
fn test_uint8_tensor_source() -> Result<()> {
    let source = Tensor::randint(256, [3, 50, 40], (Kind::Uint8, tch::Device::Cpu));
    let injector = train_views(2, 24)?;
    let views = injector.apply(source)?;
    assert_eq!(views.size(), vec![2, 3, 24, 24]);
    assert_eq!(views.kind(), Kind::Float);
    Ok(())
}

#[test]
fn test_malformed_tensor_source_is_input_error() -> Result<()> {
    let injector = train_views(1, 24)?;
    let source = Tensor::zeros([2, 10, 10], (Kind::Uint8, tch::Device::Cpu));

    let err = injector.apply(source).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AugmentError>(),
        Some(AugmentError::Input(_))
    ));
    Ok(())
}

#[test]
fn test_empty_pipeline_list_is_config_error() {
    let err = MultiViewInjector::<Pipeline>::new(Vec::new()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AugmentError>(),
        Some(AugmentError::Configuration(_))
    ));
}
