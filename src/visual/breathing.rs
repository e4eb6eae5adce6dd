use super::color::OpacityLevels;
use super::{Layout, Surface};

/// Every column breathes with the frame's global RMS.
pub(super) fn render(surface: &mut dyn Surface, layout: &Layout, rms: f64) {
    // Only the 5 and 10 level modes tint the dots; 3 levels keeps the plain colour.
    let color = match layout.levels {
        Some(levels @ (OpacityLevels::Five | OpacityLevels::Ten)) => {
            let c = layout.color_for(rms);
            if levels != OpacityLevels::Ten && c == layout.bg_color {
                return;
            }
            c
        }
        _ => layout.dot_color,
    };

    let count = (rms * layout.max_height / layout.effective_spacing).floor().max(0.0) as usize;
    for x in layout.columns(layout.spacing) {
        layout.draw_stack(surface, x, count, |_| color);
    }
}
