use image::{Rgba, RgbaImage};
use paici::config::{CompositorConfig, MaskFilter};
use paici::segmentation::{AlphaMask, CategoryMask, Compositor, MaskAligner};

fn gradient(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 2) as u8, (y * 2) as u8, 90, 255])
    })
}

/// Opaque square of side `side` at the top-left corner.
fn corner_mask(width: u32, height: u32, side: u32) -> AlphaMask {
    AlphaMask::from_fn(width, height, |x, y| x < side && y < side)
}

#[test]
fn transparent_mask_yields_no_composite() {
    let image = gradient(100, 100);
    let alpha = AlphaMask::empty(100, 100);
    assert!(Compositor::default().compose(&image, &alpha).is_none());
}

#[test]
fn tiny_subject_is_rejected() {
    // 10x10 of 100x100 = 1% coverage
    let image = gradient(100, 100);
    let alpha = corner_mask(100, 100, 10);
    assert!(Compositor::default().compose(&image, &alpha).is_none());
}

#[test]
fn coverage_exactly_at_threshold_is_accepted() {
    // 500 of 10_000 pixels = 0.05
    let image = gradient(100, 100);
    let alpha = AlphaMask::from_fn(100, 100, |x, y| y < 5);
    assert!(Compositor::default().compose(&image, &alpha).is_some());

    // one pixel fewer falls below
    let alpha = AlphaMask::from_fn(100, 100, |x, y| y < 5 && !(x == 0 && y == 0));
    assert!(Compositor::default().compose(&image, &alpha).is_none());
}

#[test]
fn fully_opaque_mask_keeps_subject_on_top() {
    let image = gradient(100, 100);
    let alpha = AlphaMask::from_fn(100, 100, |_, _| true);
    let composite = Compositor::default()
        .compose(&image, &alpha)
        .expect("full coverage composites");

    assert_eq!(composite.dimensions(), (100, 100));
    // Foreground is drawn last and opaque, so it hides glow and outline.
    assert_eq!(composite, image);
}

#[test]
fn glow_sits_under_outline_under_foreground() {
    let image = RgbaImage::from_pixel(100, 100, Rgba([200, 30, 30, 255]));
    let alpha = AlphaMask::from_fn(100, 100, |x, y| (30..70).contains(&x) && (30..70).contains(&y));
    let config = CompositorConfig::default();
    let composite = Compositor::new(config.clone())
        .compose(&image, &alpha)
        .expect("16% coverage composites");

    // Inside the subject: sharp original pixels.
    assert_eq!(composite.get_pixel(50, 50), &Rgba([200, 30, 30, 255]));

    // Just outside the edge: white halo from outline plus glow.
    let rim = composite.get_pixel(71, 50);
    assert_eq!(&rim.0[..3], &[255, 255, 255]);
    assert!(rim[3] > 0);

    // Far from the edge only the wide glow reaches, and never above its opacity.
    let halo = composite.get_pixel(90, 50);
    assert_eq!(&halo.0[..3], &[255, 255, 255]);
    assert!(halo[3] > 0);
    assert!(halo[3] <= config.glow.opacity);
    assert!(rim[3] > halo[3]);

    // Transparent canvas well outside the glow.
    let far = Compositor::new(config)
        .compose(
            &RgbaImage::from_pixel(300, 300, Rgba([1, 1, 1, 255])),
            &AlphaMask::from_fn(300, 300, |x, y| x < 80 && y < 80),
        )
        .expect("7% coverage composites");
    assert_eq!(far.get_pixel(299, 299)[3], 0);
}

#[test]
fn compose_is_deterministic() {
    let image = gradient(64, 64);
    let alpha = AlphaMask::from_fn(64, 64, |x, y| (x as i32 - 32).pow(2) + (y as i32 - 32).pow(2) < 300);
    let compositor = Compositor::default();
    let first = compositor.compose(&image, &alpha);
    let second = compositor.compose(&image, &alpha);
    assert!(first.is_some());
    assert_eq!(first, second);
}

#[test]
fn low_resolution_mask_aligns_then_composites() {
    // 4x4 native mask with the right half as subject.
    let mask = CategoryMask::from_raw(
        4,
        4,
        vec![0, 0, 1, 1, 0, 0, 1, 1, 0, 0, 1, 1, 0, 0, 1, 1],
    )
    .unwrap();
    let image = gradient(120, 80);
    let alpha = MaskAligner::new(MaskFilter::Nearest).align(&mask, 120, 80);
    assert_eq!(alpha.dimensions(), image.dimensions());

    let composite = Compositor::default().compose(&image, &alpha).unwrap();
    assert_eq!(composite.get_pixel(100, 40), image.get_pixel(100, 40));
    assert_eq!(composite.get_pixel(0, 40)[3], 0);
}
