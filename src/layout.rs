/// How a page is cut into independently compressed chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Strips { rows_per_strip: u32 },
    Tiles { width: u32, height: u32 },
}

/// A chunk's position in the page. Edge tiles extend past the page; edge strips are cut short.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Layout {
    pub fn validate(&self) -> Result<(), String> {
        match *self {
            Layout::Strips { rows_per_strip: 0 } => Err("rows per strip must be positive".into()),
            Layout::Strips { .. } => Ok(()),
            Layout::Tiles { width, height } => {
                if width == 0 || height == 0 || width % 16 != 0 || height % 16 != 0 {
                    Err(format!("tile size {width}x{height} is not a positive multiple of 16"))
                } else {
                    Ok(())
                }
            }
        }
    }

    pub fn windows(&self, (width, height): (u32, u32)) -> Vec<Window> {
        match *self {
            Layout::Strips { rows_per_strip } => {
                let rows = rows_per_strip.max(1);
                (0..height)
                    .step_by(rows as usize)
                    .map(|y| Window {
                        x: 0,
                        y,
                        width,
                        height: rows.min(height - y),
                    })
                    .collect()
            }
            Layout::Tiles {
                width: tile_width,
                height: tile_height,
            } => (0..height)
                .step_by(tile_height.max(1) as usize)
                .flat_map(|y| {
                    (0..width)
                        .step_by(tile_width.max(1) as usize)
                        .map(move |x| Window {
                            x,
                            y,
                            width: tile_width,
                            height: tile_height,
                        })
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_strip_is_short() {
        let windows = Layout::Strips { rows_per_strip: 100 }.windows((256, 256));
        let heights: Vec<u32> = windows.iter().map(|w| w.height).collect();
        assert_eq!(heights, vec![100, 100, 56]);
        assert!(windows.iter().all(|w| w.width == 256 && w.x == 0));
    }

    #[test]
    fn tiles_cover_the_page_row_major() {
        let windows = Layout::Tiles { width: 64, height: 64 }.windows((100, 70));
        let origins: Vec<(u32, u32)> = windows.iter().map(|w| (w.x, w.y)).collect();
        assert_eq!(origins, vec![(0, 0), (64, 0), (0, 64), (64, 64)]);
        assert!(windows.iter().all(|w| w.width == 64 && w.height == 64));
    }

    #[test]
    fn validation() {
        assert!(Layout::Strips { rows_per_strip: 0 }.validate().is_err());
        assert!(Layout::Tiles { width: 20, height: 16 }.validate().is_err());
        assert!(Layout::Tiles { width: 32, height: 16 }.validate().is_ok());
    }
}
