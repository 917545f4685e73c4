use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use tracing::{debug, warn};

use crate::board::fonts::FONT_FAMILY;
use crate::board::layout::{select_layout, BoardLayout, Rect, BOARD_HEIGHT, BOARD_WIDTH};
use crate::board::theme::{Palette, Theme};
use crate::board::BoardOptions;
use crate::plan::Plan;
use crate::trips::AnalyzedTrip;

const FOOTER: &str = "VOTUM — LO QUE ELIGES, TOMA FORMA";
const DESCRIPTION_LINES: usize = 4;
const DESCRIPTION_SIZE: u32 = 20;
const DESCRIPTION_LINE_HEIGHT: i32 = 30;
/// Card content above the image slot: month row, divider and name block.
const CARD_HEADER_HEIGHT: i32 = 130;

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

/// Renders the plan's vision board as a JPEG.
pub fn render_board(plan: &Plan, options: &BoardOptions, draw_text: bool) -> Result<Vec<u8>> {
    let trips = plan.board_order();
    let layout = select_layout(trips.len());
    let palette = options.theme.palette();
    debug!(
        "rendering board: {} card(s), tier {}, theme {}",
        trips.len(),
        layout.tier,
        options.theme
    );

    let mut buffer = vec![0u8; (BOARD_WIDTH * BOARD_HEIGHT * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (BOARD_WIDTH, BOARD_HEIGHT))
            .into_drawing_area();
        let painter = Painter {
            area: &root,
            draw_text,
        };
        root.fill(&palette.background).map_err(draw_error)?;
        painter.header(layout, &palette, options)?;
        for (index, trip) in trips.iter().enumerate() {
            painter.card(layout, &palette, options.theme, trip, index, trips.len())?;
        }
        painter.centered(
            FOOTER,
            layout.footer_rect(),
            18,
            &palette.text.mix(0.2),
        )?;
        root.present().map_err(draw_error)?;
    }

    let mut canvas = RgbImage::from_raw(BOARD_WIDTH, BOARD_HEIGHT, buffer)
        .ok_or_else(|| anyhow!("board buffer has the wrong size"))?;
    for (index, trip) in trips.iter().enumerate() {
        let Some(url) = trip.image_url.as_deref() else {
            continue;
        };
        let Some(picture) = decode_data_url(url) else {
            warn!("trip {} has an unreadable image; leaving its slot empty", trip.id());
            continue;
        };
        let slot = image_slot(layout, index, trips.len());
        let fitted = picture
            .resize_to_fill(slot.width, slot.height, FilterType::Triangle)
            .to_rgb8();
        imageops::replace(&mut canvas, &fitted, i64::from(slot.x), i64::from(slot.y));
    }

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, options.jpeg_quality.clamp(1, 100))
        .encode_image(&canvas)
        .context("failed encoding board JPEG")?;
    Ok(out)
}

/// Image slot of the `index`-th card.
pub fn image_slot(layout: &BoardLayout, index: usize, trip_count: usize) -> Rect {
    let card = layout.card_rect(index, trip_count);
    let padding = BoardLayout::card_padding(trip_count) as i32;
    let top = card.y + padding + CARD_HEADER_HEIGHT;
    let reserved_below = 20 + DESCRIPTION_LINE_HEIGHT * DESCRIPTION_LINES as i32 + padding;
    let available = (card.bottom() - top - reserved_below).max(0) as u32;
    Rect {
        x: card.x + padding,
        y: top,
        width: card.width.saturating_sub(2 * padding as u32),
        height: layout.image_height.min(available),
    }
}

pub fn decode_data_url(url: &str) -> Option<DynamicImage> {
    let (_, payload) = url.strip_prefix("data:")?.split_once(";base64,")?;
    let bytes = BASE64.decode(payload.trim()).ok()?;
    image::load_from_memory(&bytes).ok()
}

fn draw_error<E: std::fmt::Debug>(err: E) -> anyhow::Error {
    anyhow!("board drawing failed: {err:?}")
}

struct Painter<'a, 'b> {
    area: &'a Area<'b>,
    draw_text: bool,
}

impl Painter<'_, '_> {
    fn rect(&self, rect: Rect, style: ShapeStyle) -> Result<()> {
        self.area
            .draw(&Rectangle::new(rect.corners(), style))
            .map_err(draw_error)
    }

    fn text(&self, text: &str, at: (i32, i32), size: u32, color: &RGBAColor, anchor: HPos) -> Result<()> {
        if !self.draw_text || text.is_empty() {
            return Ok(());
        }
        let style = TextStyle::from((FONT_FAMILY, size).into_font())
            .color(color)
            .pos(Pos::new(anchor, VPos::Top));
        self.area
            .draw(&Text::new(text.to_string(), at, style))
            .map_err(draw_error)
    }

    fn centered(&self, text: &str, within: Rect, size: u32, color: &RGBAColor) -> Result<()> {
        let x = within.x + within.width as i32 / 2;
        let y = within.y + (within.height as i32 - size as i32) / 2;
        self.text(text, (x, y), size, color, HPos::Center)
    }

    fn text_width(&self, text: &str, size: u32) -> Result<u32> {
        let style = TextStyle::from((FONT_FAMILY, size).into_font());
        let (width, _) = self
            .area
            .estimate_text_size(text, &style)
            .map_err(draw_error)?;
        Ok(width)
    }

    /// Greedy word wrap; the last kept line gets an ellipsis when text is cut.
    fn wrap(&self, text: &str, size: u32, max_width: u32, max_lines: usize) -> Result<Vec<String>> {
        if !self.draw_text {
            return Ok(Vec::new());
        }
        let mut lines: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut truncated = false;
        for word in text.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if current.is_empty() || self.text_width(&candidate, size)? <= max_width {
                current = candidate;
                continue;
            }
            lines.push(std::mem::replace(&mut current, word.to_string()));
            if lines.len() == max_lines {
                truncated = true;
                current.clear();
                break;
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
        if truncated {
            if let Some(last) = lines.last_mut() {
                last.push('…');
            }
        }
        Ok(lines)
    }

    fn header(&self, layout: &BoardLayout, palette: &Palette, options: &BoardOptions) -> Result<()> {
        let header = layout.header_rect();
        let center_x = header.x + header.width as i32 / 2;
        let block_top = header.y + (header.height as i32 - 170).max(0) / 2;

        self.text(
            &options.title.to_uppercase(),
            (center_x, block_top),
            100,
            &palette.text,
            HPos::Center,
        )?;
        let rule_top = block_top + 110;
        self.rect(
            Rect {
                x: center_x - 90,
                y: rule_top,
                width: 180,
                height: 3,
            },
            palette.gold.mix(0.3).filled(),
        )?;
        self.text(
            &options.theme.emotion().to_uppercase(),
            (center_x, rule_top + 23),
            22,
            &palette.gold.mix(0.7),
            HPos::Center,
        )
    }

    fn card(
        &self,
        layout: &BoardLayout,
        palette: &Palette,
        theme: Theme,
        trip: &AnalyzedTrip,
        index: usize,
        count: usize,
    ) -> Result<()> {
        let card = layout.card_rect(index, count);
        let padding = BoardLayout::card_padding(count) as i32;
        let inner_left = card.x + padding;
        let inner_right = card.right() - padding;
        let inner_width = (inner_right - inner_left).max(0) as u32;

        self.rect(card, palette.card_background.filled())?;
        self.rect(card, palette.accent.stroke_width(1))?;

        let top = card.y + padding;
        let month = trip.display_month().name().to_uppercase();
        self.text(&month, (inner_left, top), 20, &palette.gold, HPos::Left)?;
        self.text(
            &format!("{:02}", index + 1),
            (inner_right, top),
            24,
            &palette.gold.mix(0.15),
            HPos::Right,
        )?;
        self.rect(
            Rect {
                x: inner_left,
                y: top + 36,
                width: inner_width,
                height: 1,
            },
            palette.accent.filled(),
        )?;

        let name_lines = self.wrap(&trip.name().to_uppercase(), 26, inner_width, 2)?;
        for (line, text) in name_lines.iter().enumerate() {
            self.text(
                text,
                (inner_left, top + 60 + line as i32 * 31),
                26,
                &palette.text,
                HPos::Left,
            )?;
        }

        let slot = image_slot(layout, index, count);
        self.rect(slot, BLACK.filled())?;
        self.rect(slot, palette.accent.stroke_width(1))?;

        let description = format!("\"{}\"", trip.experience_description.trim());
        let description_color = palette.text.mix(theme.description_opacity());
        let lines = self.wrap(&description, DESCRIPTION_SIZE, inner_width, DESCRIPTION_LINES)?;
        let text_top = slot.bottom() + 30;
        for (line, text) in lines.iter().enumerate() {
            self.text(
                text,
                (inner_left, text_top + line as i32 * DESCRIPTION_LINE_HEIGHT),
                DESCRIPTION_SIZE,
                &description_color,
                HPos::Left,
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{GenericImageView, ImageFormat, Rgb};

    use super::*;
    use crate::trips::fixtures::trip;

    fn red_png_data_url() -> String {
        let picture = RgbImage::from_pixel(8, 6, Rgb([220, 20, 20]));
        let mut bytes = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(picture)
            .write_to(&mut bytes, ImageFormat::Png)
            .unwrap();
        format!("data:image/png;base64,{}", BASE64.encode(bytes.into_inner()))
    }

    fn options(theme: Theme) -> BoardOptions {
        BoardOptions {
            theme,
            title: "MI MAPA DE POSIBILIDADES 2026".to_string(),
            jpeg_quality: 90,
        }
    }

    #[test]
    fn decodes_only_base64_data_urls() {
        assert!(decode_data_url(&red_png_data_url()).is_some());
        assert!(decode_data_url("https://example.com/a.png").is_none());
        assert!(decode_data_url("data:image/png;base64,@@@").is_none());
    }

    #[test]
    fn image_slots_stay_inside_their_cards() {
        for count in 1..=12 {
            let layout = select_layout(count);
            for index in 0..count {
                let card = layout.card_rect(index, count);
                let slot = image_slot(layout, index, count);
                assert!(slot.height > 0 && slot.width > 0);
                assert!(slot.x >= card.x && slot.right() <= card.right());
                assert!(slot.y >= card.y && slot.bottom() <= card.bottom());
            }
        }
    }

    #[test]
    fn renders_images_into_slots_without_fonts() {
        let mut pictured = trip("a", 100.0, Some(0));
        pictured.image_url = Some(red_png_data_url());
        let plan = Plan::new(1, vec![pictured, trip("b", 100.0, Some(5))]);

        let jpeg = render_board(&plan, &options(Theme::Votum), false).unwrap();
        let board = image::load_from_memory(&jpeg).unwrap();
        assert_eq!(board.dimensions(), (BOARD_WIDTH, BOARD_HEIGHT));

        let layout = select_layout(2);
        let sample = |slot: Rect| {
            let pixel = board.get_pixel(
                (slot.x + slot.width as i32 / 2) as u32,
                (slot.y + slot.height as i32 / 2) as u32,
            );
            (pixel[0], pixel[1], pixel[2])
        };
        let (r, g, b) = sample(image_slot(layout, 0, 2));
        assert!(r > 150 && g < 80 && b < 80, "expected red, got {r},{g},{b}");
        let (r, g, b) = sample(image_slot(layout, 1, 2));
        assert!(r < 30 && g < 30 && b < 30, "expected black, got {r},{g},{b}");

        let corner = board.get_pixel(4, 4);
        assert!(corner[2] > corner[0], "votum background is blue-black");
    }

    #[test]
    fn light_theme_background() {
        let plan = Plan::new(1, vec![trip("a", 100.0, Some(0))]);
        let jpeg = render_board(&plan, &options(Theme::Vmap), false).unwrap();
        let board = image::load_from_memory(&jpeg).unwrap();
        let corner = board.get_pixel(4, 4);
        assert!(corner[0] > 240 && corner[1] > 240 && corner[2] > 240);
    }
}
