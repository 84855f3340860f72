//! Seeded colour ramps for the diffuse map.

use image::Rgba;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::buffer::PixelBuffer;

/// One stop of a colour ramp, `position` in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorStop {
    pub position: f32,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl ColorStop {
    fn new(position: f32, [r, g, b]: [u8; 3]) -> Self {
        Self { position, r, g, b }
    }
}

fn jitter(rng: &mut ChaCha8Rng, base: [u8; 3], amount: i16) -> [u8; 3] {
    base.map(|c| (c as i16 + rng.random_range(-amount..=amount)).clamp(0, 255) as u8)
}

fn mix(a: [u8; 3], b: [u8; 3], t: f32) -> [u8; 3] {
    [0, 1, 2].map(|i| (a[i] as f32 + (b[i] as f32 - a[i] as f32) * t).round() as u8)
}

/// Ramp from deep water (left) to peaks (right).
///
/// Pure function of `seed`: the same seed always yields the same stops.
/// Positions are strictly increasing, first 0.0 and last 1.0.
pub fn generate_gradient(seed: i32) -> Vec<ColorStop> {
    // fixed-algorithm stream, stable across rand releases
    let mut rng = ChaCha8Rng::seed_from_u64(seed as u32 as u64);

    // palettes to pick land tones from
    const LOWLANDS: [[u8; 3]; 5] = [
        [74, 120, 52],
        [132, 110, 64],
        [170, 96, 58],
        [96, 112, 118],
        [150, 140, 92],
    ];
    const HIGHLANDS: [[u8; 3]; 4] = [
        [92, 84, 70],
        [120, 70, 48],
        [64, 72, 60],
        [110, 104, 120],
    ];

    let deep = jitter(&mut rng, [12, 28, 74], 10);
    let shallow = jitter(&mut rng, [40, 96, 150], 20);
    let shore = jitter(&mut rng, [196, 182, 128], 16);
    let lowland_pick = LOWLANDS[rng.random_range(0..LOWLANDS.len())];
    let lowland = jitter(&mut rng, lowland_pick, 14);
    let highland_pick = HIGHLANDS[rng.random_range(0..HIGHLANDS.len())];
    let highland = jitter(&mut rng, highland_pick, 14);
    let peak = if rng.random_bool(0.6) {
        jitter(&mut rng, [236, 236, 240], 8)
    } else {
        mix(highland, [40, 36, 32], 0.5)
    };

    let shallow_at = rng.random_range(0.22..0.32);
    let shore_at = shallow_at + rng.random_range(0.04..0.08);
    let lowland_at = shore_at + rng.random_range(0.04..0.1);
    let highland_at = lowland_at + rng.random_range(0.15..0.25);

    vec![
        ColorStop::new(0.0, deep),
        ColorStop::new(shallow_at, shallow),
        ColorStop::new(shore_at, shore),
        ColorStop::new(lowland_at, lowland),
        ColorStop::new(highland_at, highland),
        ColorStop::new(1.0, peak),
    ]
}

/// Colour of the ramp at `t`.
pub fn sample_gradient(stops: &[ColorStop], t: f32) -> Rgba<u8> {
    let Some(first) = stops.first() else {
        return Rgba([0, 0, 0, 255]);
    };
    if t <= first.position {
        return Rgba([first.r, first.g, first.b, 255]);
    }

    for pair in stops.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if t <= b.position {
            let span = (b.position - a.position).max(f32::EPSILON);
            let [r, g, bl] = mix([a.r, a.g, a.b], [b.r, b.g, b.b], (t - a.position) / span);
            return Rgba([r, g, bl, 255]);
        }
    }

    let last = stops[stops.len() - 1];
    Rgba([last.r, last.g, last.b, 255])
}

/// Paints the ramp left to right across the whole buffer, every row identical.
pub fn paint_horizontal_gradient(buffer: &mut PixelBuffer, stops: &[ColorStop]) {
    let width = buffer.width();
    let span = (width.max(2) - 1) as f32;
    let row: Vec<Rgba<u8>> = (0..width)
        .map(|x| sample_gradient(stops, x as f32 / span))
        .collect();

    for (x, _, pixel) in buffer.enumerate_pixels_mut() {
        *pixel = row[x as usize];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    #[test]
    fn same_seed_same_gradient() {
        assert_eq!(generate_gradient(96354), generate_gradient(96354));
        assert_eq!(generate_gradient(-7), generate_gradient(-7));
    }

    #[test]
    fn ramp_follows_the_chacha_stream_for_the_seed() {
        // negative seeds are taken by their 32-bit pattern
        let mut rng = ChaCha8Rng::seed_from_u64(4_294_967_289);
        let deep = jitter(&mut rng, [12, 28, 74], 10);
        let shallow = jitter(&mut rng, [40, 96, 150], 20);

        let stops = generate_gradient(-7);
        assert_eq!([stops[0].r, stops[0].g, stops[0].b], deep);
        assert_eq!([stops[1].r, stops[1].g, stops[1].b], shallow);
    }

    #[test]
    fn stops_are_ordered_and_span_unit_range() {
        for seed in [0, 1, -1, 96354, i32::MIN, i32::MAX] {
            let stops = generate_gradient(seed);
            assert_eq!(stops.first().unwrap().position, 0.0);
            assert_eq!(stops.last().unwrap().position, 1.0);
            assert!(stops.windows(2).all(|w| w[0].position < w[1].position));
        }
    }

    #[test]
    fn sampling_hits_stop_colours_at_ends() {
        let stops = vec![
            ColorStop::new(0.0, [0, 0, 0]),
            ColorStop::new(1.0, [200, 100, 50]),
        ];
        assert_eq!(sample_gradient(&stops, 0.0), Rgba([0, 0, 0, 255]));
        assert_eq!(sample_gradient(&stops, 1.0), Rgba([200, 100, 50, 255]));
        assert_eq!(sample_gradient(&stops, 0.5), Rgba([100, 50, 25, 255]));
    }

    #[test]
    fn painted_ramp_is_horizontal() {
        let stops = generate_gradient(3);
        let mut buffer = RgbaImage::new(16, 4);
        paint_horizontal_gradient(&mut buffer, &stops);

        let left = stops[0];
        assert_eq!(*buffer.get_pixel(0, 2), Rgba([left.r, left.g, left.b, 255]));
        for x in 0..16 {
            assert_eq!(buffer.get_pixel(x, 0), buffer.get_pixel(x, 3));
        }
    }
}
