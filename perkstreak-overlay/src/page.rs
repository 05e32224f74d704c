//! The streamer overlay page.
//!
//! Rendered once per `/api/update-overlay` push and written to disk, so OBS
//! can load it as a plain browser source. The page also polls
//! `/api/progress` every two seconds, which keeps the bars moving between
//! pushes.

use perkstreak_server::routes::util::escape_html;
use perkstreak_server::tracker::overlay::{CurrentCharacter, OverlayUpdate};

const POLL_INTERVAL_MS: u32 = 2000;

fn percent(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (completed.min(total) as f64 / total as f64) * 100.0
}

fn progress_card(html: &mut String, role: &str, completed: usize, total: usize) {
    html.push_str(&format!(
        r#"  <div class="overlay-card" id="{role}-card">
    <div class="overlay-title">All Perk Streak</div>
    <div class="progress-section">
      <div class="progress-bar-bg">
        <div class="progress-bar-fill {role}-fill" id="{role}-bar" style="width: {pct:.1}%"></div>
      </div>
      <div class="progress-count" id="{role}-count">{completed}/{total}</div>
    </div>
  </div>
"#,
        pct = percent(completed, total),
    ));
}

fn current_card(html: &mut String, label: &str, character: &CurrentCharacter) {
    html.push_str(&format!(
        r#"  <div class="overlay-card current-character">
    <div class="overlay-title">{label}: {name}</div>
    <ul class="current-perks">
"#,
        name = escape_html(&character.name),
    ));
    if character.perks.is_empty() {
        html.push_str("      <li class=\"current-perk empty\">No perks yet</li>\n");
    }
    for perk in &character.perks {
        html.push_str(&format!(
            "      <li class=\"current-perk\">{}</li>\n",
            escape_html(perk)
        ));
    }
    html.push_str("    </ul>\n  </div>\n");
}

/// Render the full overlay document for `update`.
pub fn render_overlay(update: &OverlayUpdate) -> String {
    let settings = &update.settings;
    let progress = &update.progress;
    let body_class = if settings.compact_mode { "compact" } else { "" };

    let mut html = String::with_capacity(4096);
    html.push_str(&format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>DBD Perk Streak - Streamer Overlay</title>
  <link rel="stylesheet" href="streamer-overlay.css">
</head>
<body class="{body_class}">
"#
    ));

    if settings.show_killers {
        progress_card(&mut html, "killer", progress.killer_completed, progress.killer_total);
    }
    if settings.show_survivors {
        progress_card(
            &mut html,
            "survivor",
            progress.survivor_completed,
            progress.survivor_total,
        );
    }

    if settings.show_current_character {
        if let Some(killer) = &update.current_killer {
            current_card(&mut html, "Killer", killer);
        }
        if let Some(survivor) = &update.current_survivor {
            current_card(&mut html, "Survivor", survivor);
        }
    }

    if let Some(stamp) = &update.last_updated {
        html.push_str(&format!(
            "  <div class=\"last-updated\" hidden>{}</div>\n",
            escape_html(stamp)
        ));
    }

    html.push_str(&format!(
        r#"  <script>
    function setRole(role, completed, total) {{
      var count = document.getElementById(role + '-count');
      var bar = document.getElementById(role + '-bar');
      if (!count || !bar) return;
      count.textContent = completed + '/' + total;
      bar.style.width = (total > 0 ? Math.min(completed / total, 1) * 100 : 0) + '%';
    }}
    async function refresh() {{
      try {{
        var res = await fetch('/api/progress');
        if (!res.ok) throw new Error('HTTP ' + res.status);
        var p = await res.json();
        setRole('killer', p.killerCompleted, p.killerTotal);
        setRole('survivor', p.survivorCompleted, p.survivorTotal);
      }} catch (e) {{
        ['killer', 'survivor'].forEach(function(role) {{
          var count = document.getElementById(role + '-count');
          if (count) count.textContent = 'Error';
        }});
      }}
    }}
    refresh();
    setInterval(refresh, {POLL_INTERVAL_MS});
  </script>
</body>
</html>
"#
    ));
    html
}
