use std::time::Duration;

use crate::audio::track::Track;

/// Página de la cola lista para mostrar.
#[derive(Debug, Clone)]
pub struct QueuePage<'a> {
    /// (posición en la cola, track)
    pub items: Vec<(usize, &'a Track)>,
    pub current_page: usize,
    pub total_pages: usize,
}

/// Obtiene una página de la cola. Las páginas empiezan en 1; una página
/// fuera de rango devuelve una lista vacía.
pub fn page(queue: &[Track], page: usize, per_page: usize) -> QueuePage<'_> {
    let per_page = per_page.max(1);
    let safe_page = page.max(1);
    let start = (safe_page - 1).saturating_mul(per_page);
    let end = start.saturating_add(per_page).min(queue.len());
    let total_pages = if queue.is_empty() { 1 } else { queue.len().div_ceil(per_page) };

    QueuePage {
        items: if start < queue.len() {
            queue[start..end].iter().enumerate().map(|(i, t)| (start + i, t)).collect()
        } else {
            Vec::new()
        },
        current_page: safe_page,
        total_pages,
    }
}

pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

pub fn total_duration(queue: &[Track]) -> Duration {
    queue.iter().filter_map(Track::duration).sum()
}

/// Una línea por track: `**título** de artista (3:35) · <@usuario>`
pub fn format_track(track: &Track) -> String {
    let mut line = format!("**{}**", track.title());
    if let Some(artist) = track.artist() {
        line.push_str(&format!(" de {}", artist));
    }
    match track.duration() {
        Some(duration) => line.push_str(&format!(" ({})", format_duration(duration))),
        None => line.push_str(" (🔴 en vivo)"),
    }
    line.push_str(&format!(" · <@{}>", track.requested_by()));
    line
}

/// Lista de la cola paginada. La posición 0 es el track en reproducción.
pub fn format_queue(queue: &[Track], page_number: usize, per_page: usize) -> String {
    let page = page(queue, page_number, per_page);
    let mut lines = vec![format!(
        "🎶 **Cola de reproducción** ({} tracks, {})",
        queue.len(),
        format_duration(total_duration(queue))
    )];

    if page.items.is_empty() {
        lines.push(format!("_La página {} está vacía._", page.current_page));
    }

    for (position, track) in &page.items {
        if *position == 0 {
            lines.push(format!("▶️ {}", format_track(track)));
        } else {
            lines.push(format!("`{}.` {}", position, format_track(track)));
        }
    }

    lines.push(format!("Página {}/{}", page.current_page, page.total_pages));
    lines.join("\n")
}
