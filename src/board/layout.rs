use serde::Serialize;

pub const BOARD_WIDTH: u32 = 2550;
pub const BOARD_HEIGHT: u32 = 3300;

/// Fixed geometry for one density tier of the vision board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoardLayout {
    /// Largest trip count this tier is meant for.
    pub tier: usize,
    pub cols: u32,
    pub rows: u32,
    pub header_height: u32,
    pub footer_height: u32,
    pub grid_height: u32,
    pub card_width: u32,
    pub card_height: u32,
    pub image_height: u32,
    pub gap: u32,
    pub padding_v: u32,
    pub padding_h: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    pub fn corners(&self) -> [(i32, i32); 2] {
        [(self.x, self.y), (self.right(), self.bottom())]
    }
}

const TIERS: [BoardLayout; 6] = [
    BoardLayout {
        tier: 1,
        cols: 1,
        rows: 1,
        header_height: 420,
        footer_height: 280,
        grid_height: 2200,
        card_width: 1600,
        card_height: 1400,
        image_height: 800,
        gap: 0,
        padding_v: 150,
        padding_h: 120,
    },
    BoardLayout {
        tier: 2,
        cols: 2,
        rows: 1,
        header_height: 380,
        footer_height: 260,
        grid_height: 2200,
        card_width: 1050,
        card_height: 1250,
        image_height: 700,
        gap: 100,
        padding_v: 150,
        padding_h: 120,
    },
    BoardLayout {
        tier: 4,
        cols: 2,
        rows: 2,
        header_height: 300,
        footer_height: 200,
        grid_height: 2500,
        card_width: 1000,
        card_height: 1150,
        image_height: 600,
        gap: 100,
        padding_v: 120,
        padding_h: 120,
    },
    BoardLayout {
        tier: 6,
        cols: 3,
        rows: 2,
        header_height: 240,
        footer_height: 160,
        grid_height: 2500,
        card_width: 720,
        card_height: 1120,
        image_height: 500,
        gap: 100,
        padding_v: 120,
        padding_h: 100,
    },
    BoardLayout {
        tier: 9,
        cols: 3,
        rows: 3,
        header_height: 200,
        footer_height: 140,
        grid_height: 2650,
        card_width: 720,
        card_height: 850,
        image_height: 350,
        gap: 60,
        padding_v: 100,
        padding_h: 100,
    },
    BoardLayout {
        tier: 12,
        cols: 3,
        rows: 4,
        header_height: 180,
        footer_height: 140,
        grid_height: 2750,
        card_width: 720,
        card_height: 650,
        image_height: 260,
        gap: 40,
        padding_v: 80,
        padding_h: 100,
    },
];

/// Least dense tier whose capacity fits `trip_count`; larger counts get the
/// last tier.
pub fn select_layout(trip_count: usize) -> &'static BoardLayout {
    TIERS
        .iter()
        .find(|layout| trip_count <= layout.tier)
        .unwrap_or(&TIERS[TIERS.len() - 1])
}

impl BoardLayout {
    pub fn card_area(&self) -> u64 {
        u64::from(self.card_width) * u64::from(self.card_height)
    }

    pub fn header_rect(&self) -> Rect {
        Rect {
            x: self.padding_h as i32,
            y: self.padding_v as i32,
            width: BOARD_WIDTH - 2 * self.padding_h,
            height: self.header_height,
        }
    }

    pub fn grid_rect(&self) -> Rect {
        let header = self.header_rect();
        Rect {
            x: header.x,
            y: header.bottom(),
            width: header.width,
            height: self.grid_height,
        }
    }

    pub fn footer_rect(&self) -> Rect {
        Rect {
            x: self.padding_h as i32,
            y: (BOARD_HEIGHT - self.padding_v - self.footer_height) as i32,
            width: BOARD_WIDTH - 2 * self.padding_h,
            height: self.footer_height,
        }
    }

    /// Card rectangle for the `index`-th trip. Rows fill left to right and the
    /// block of used cells is centred in the grid area.
    pub fn card_rect(&self, index: usize, trip_count: usize) -> Rect {
        let cols = self.cols as usize;
        let used_cols = trip_count.clamp(1, cols) as u32;
        let used_rows = trip_count.div_ceil(cols).clamp(1, self.rows as usize) as u32;
        let block_width = used_cols * self.card_width + (used_cols - 1) * self.gap;
        let block_height = used_rows * self.card_height + (used_rows - 1) * self.gap;

        let grid = self.grid_rect();
        let left = grid.x + (grid.width as i32 - block_width as i32).max(0) / 2;
        let top = grid.y + (grid.height as i32 - block_height as i32).max(0) / 2;

        let col = (index % cols) as i32;
        let row = (index / cols) as i32;
        Rect {
            x: left + col * (self.card_width + self.gap) as i32,
            y: top + row * (self.card_height + self.gap) as i32,
            width: self.card_width,
            height: self.card_height,
        }
    }

    pub fn card_padding(trip_count: usize) -> u32 {
        if trip_count > 4 {
            40
        } else {
            55
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_tier_by_count() {
        assert_eq!(select_layout(0).tier, 1);
        assert_eq!(select_layout(1).tier, 1);
        assert_eq!(select_layout(2).tier, 2);
        assert_eq!(select_layout(3).tier, 4);
        assert_eq!(select_layout(5).tier, 6);
        assert_eq!(select_layout(7).tier, 9);
        assert_eq!(select_layout(10).tier, 12);
        assert_eq!(select_layout(40).tier, 12);
    }

    #[test]
    fn denser_tiers_never_have_larger_cards() {
        let areas = [1, 2, 4, 6, 9, 12]
            .into_iter()
            .map(|count| select_layout(count).card_area())
            .collect::<Vec<_>>();
        assert!(areas.windows(2).all(|pair| pair[1] <= pair[0]), "{areas:?}");
    }

    #[test]
    fn every_card_fits_on_the_page() {
        for count in 1..=12 {
            let layout = select_layout(count);
            assert!(count <= (layout.cols * layout.rows) as usize);
            for index in 0..count {
                let card = layout.card_rect(index, count);
                assert!(card.x >= 0 && card.right() <= BOARD_WIDTH as i32, "count {count}");
                assert!(card.y >= 0 && card.bottom() <= BOARD_HEIGHT as i32, "count {count}");
                assert!(card.y >= layout.grid_rect().y);
            }
        }
    }

    #[test]
    fn partial_rows_are_centred() {
        let layout = select_layout(2);
        let left = layout.card_rect(0, 2);
        let right = layout.card_rect(1, 2);
        let margin_left = left.x;
        let margin_right = BOARD_WIDTH as i32 - right.right();
        assert!((margin_left - margin_right).abs() <= 1);
    }
}
