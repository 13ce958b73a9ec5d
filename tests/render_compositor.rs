use std::io::Cursor;

use strata::{Canvas, Combinations, Compositor, LayerRegistry, StrataError, TraitDef, TraitSource};

fn solid_png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let mut img = image::RgbaImage::new(width, height);
    for px in img.pixels_mut() {
        *px = image::Rgba(rgba);
    }
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn solid_trait(name: &str, rgba: [u8; 4]) -> TraitDef {
    TraitDef::new(name, TraitSource::memory(solid_png(1, 1, rgba)))
}

fn single_selection(reg: &LayerRegistry) -> strata::Selection {
    let mut combos = Combinations::new(reg);
    let sel = combos.next().expect("registry yields one combination");
    assert!(combos.next().is_none());
    sel
}

const RED: [u8; 4] = [255, 0, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];
const CLEAR: [u8; 4] = [0, 0, 0, 0];

#[test]
fn later_layers_draw_on_top() {
    let mut reg = LayerRegistry::new();
    reg.add_layer("Background", [solid_trait("red", RED)]).unwrap();
    reg.add_layer("Overlay", [solid_trait("blue", BLUE)]).unwrap();

    let mut compositor = Compositor::new();
    let raster = compositor
        .render(&single_selection(&reg), Canvas::new(4, 4).unwrap())
        .unwrap();

    assert_eq!(raster.width, 4);
    assert_eq!(raster.height, 4);
    for px in raster.data.chunks_exact(4) {
        assert_eq!(px, &BLUE);
    }
}

#[test]
fn transparent_upper_layer_lets_lower_layers_show_through() {
    let mut reg = LayerRegistry::new();
    reg.add_layer("Background", [solid_trait("red", RED)]).unwrap();
    reg.add_layer("Overlay", [solid_trait("none", CLEAR)]).unwrap();

    let mut compositor = Compositor::new();
    let raster = compositor
        .render(&single_selection(&reg), Canvas::new(4, 4).unwrap())
        .unwrap();

    for px in raster.data.chunks_exact(4) {
        assert_eq!(px, &RED);
    }
}

#[test]
fn images_are_stretched_to_the_exact_canvas_size() {
    let mut reg = LayerRegistry::new();
    reg.add_layer(
        "Background",
        [TraitDef::new("red", TraitSource::memory(solid_png(1, 1, RED)))],
    )
    .unwrap();

    let mut compositor = Compositor::new();
    let raster = compositor
        .render(&single_selection(&reg), Canvas::new(6, 3).unwrap())
        .unwrap();

    assert_eq!(raster.width, 6);
    assert_eq!(raster.height, 3);
    assert_eq!(raster.data.len(), 6 * 3 * 4);
    for px in raster.data.chunks_exact(4) {
        assert_eq!(px, &RED);
    }
}

#[test]
fn render_is_idempotent_for_a_fixed_selection_and_size() {
    let mut checker = image::RgbaImage::new(2, 2);
    checker.put_pixel(0, 0, image::Rgba(RED));
    checker.put_pixel(1, 0, image::Rgba(BLUE));
    checker.put_pixel(0, 1, image::Rgba([0, 255, 0, 128]));
    checker.put_pixel(1, 1, image::Rgba(CLEAR));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(checker)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();

    let mut reg = LayerRegistry::new();
    reg.add_layer(
        "Body",
        [TraitDef::new("checker", TraitSource::memory(buf))],
    )
    .unwrap();

    let sel = single_selection(&reg);
    let canvas = Canvas::new(8, 8).unwrap();
    let mut compositor = Compositor::new();

    let a = compositor.render(&sel, canvas).unwrap();
    let b = compositor.render(&sel, canvas).unwrap();
    assert_eq!(a, b, "repeated renders must be pixel-identical");
}

#[test]
fn decoded_assets_are_cached_across_renders() {
    let mut reg = LayerRegistry::new();
    reg.add_layer("Background", [solid_trait("red", RED)]).unwrap();
    reg.add_layer("Overlay", [solid_trait("blue", BLUE)]).unwrap();

    let sel = single_selection(&reg);
    let canvas = Canvas::new(4, 4).unwrap();
    let mut compositor = Compositor::new();
    assert!(compositor.assets().is_empty());

    compositor.render(&sel, canvas).unwrap();
    assert_eq!(compositor.assets().len(), 2);

    compositor.render(&sel, canvas).unwrap();
    assert_eq!(
        compositor.assets().len(),
        2,
        "repeat renders must hit the cache, not decode again"
    );
}

#[test]
fn failed_load_names_the_trait_and_leaves_the_surface_clean() {
    let mut good = LayerRegistry::new();
    good.add_layer("Background", [solid_trait("blue", BLUE)]).unwrap();
    let good_sel = single_selection(&good);

    let mut bad = LayerRegistry::new();
    bad.add_layer("Background", [solid_trait("blue", BLUE)]).unwrap();
    bad.add_layer(
        "Hat",
        [TraitDef::new("ghost", TraitSource::path("missing/ghost.png"))],
    )
    .unwrap();
    let bad_sel = single_selection(&bad);

    let mut clear_reg = LayerRegistry::new();
    clear_reg
        .add_layer("Background", [solid_trait("none", CLEAR)])
        .unwrap();
    let clear_sel = single_selection(&clear_reg);

    let canvas = Canvas::new(4, 4).unwrap();
    let mut compositor = Compositor::new();

    // Paint the surface once, then fail a render, then check nothing leaked into the next one.
    compositor.render(&good_sel, canvas).unwrap();

    let err = compositor.render(&bad_sel, canvas).unwrap_err();
    match err {
        StrataError::AssetLoad { source_ref, .. } => {
            assert!(source_ref.contains("ghost.png"), "got '{source_ref}'");
        }
        other => panic!("expected AssetLoad, got {other}"),
    }

    let raster = compositor.render(&clear_sel, canvas).unwrap();
    for px in raster.data.chunks_exact(4) {
        assert_eq!(px, &CLEAR, "surface must be reset between renders");
    }
}

#[test]
fn png_round_trip_preserves_the_composite() {
    let mut reg = LayerRegistry::new();
    reg.add_layer("Background", [solid_trait("red", RED)]).unwrap();

    let mut compositor = Compositor::new();
    let raster = compositor
        .render(&single_selection(&reg), Canvas::new(4, 4).unwrap())
        .unwrap();

    let png = raster.encode_png().unwrap();
    let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
    assert_eq!(decoded.dimensions(), (4, 4));
    assert_eq!(decoded.into_raw(), raster.data);
}
