use rand::Rng;

// Seed shared with every client for procedural room generation
pub fn generate_seed() -> i64 {
    rand::thread_rng().gen_range(0..i64::MAX)
}

// Pixel coordinate to grid cell, rounding toward negative infinity
pub fn to_cells(pixels: i32, scale: i32) -> i32 {
    if scale > 0 {
        pixels.div_euclid(scale)
    } else {
        pixels
    }
}

pub fn to_pixels(cells: i32, scale: i32) -> i32 {
    if scale > 0 {
        cells.saturating_mul(scale)
    } else {
        cells
    }
}

// Calculate normalized vector
pub fn normalize_vector(x: f32, y: f32) -> (f32, f32) {
    let magnitude = (x * x + y * y).sqrt();
    if magnitude > 0.0 {
        (x / magnitude, y / magnitude)
    } else {
        (0.0, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_normalize_vector() {
        let (x, y) = normalize_vector(3.0, 4.0);
        assert_approx_eq!(x, 0.6, 1e-6);
        assert_approx_eq!(y, 0.8, 1e-6);
        assert_eq!(normalize_vector(0.0, 0.0), (0.0, 0.0));
    }

    #[test]
    fn test_scaling_rounds_down() {
        assert_eq!(to_cells(159, 10), 15);
        assert_eq!(to_cells(-1, 10), -1);
        assert_eq!(to_cells(-10, 10), -1);
        assert_eq!(to_pixels(15, 10), 150);
        assert_eq!(to_cells(42, 0), 42);
    }

    #[test]
    fn test_seed_is_non_negative() {
        for _ in 0..32 {
            assert!(generate_seed() >= 0);
        }
    }
}
