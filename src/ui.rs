use crate::models::{BoardResponse, Record, RowView};
use crate::schema::{daily, tasks, DailyLayout, TableSchema, TaskLayout};

/// Status line shown above a page.
#[derive(Debug, Clone, Copy)]
pub enum Notice<'a> {
    Ok(&'a str),
    Error(&'a str),
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn encode_query(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

fn page(title: &str, notice: Option<Notice<'_>>, body: &str) -> String {
    let status = match notice {
        Some(Notice::Ok(message)) => format!(r#"<div class="status" data-type="ok">{}</div>"#, escape(message)),
        Some(Notice::Error(message)) => {
            format!(r#"<div class="status" data-type="error">{}</div>"#, escape(message))
        }
        None => String::new(),
    };
    PAGE_HTML
        .replace("{{TITLE}}", &escape(title))
        .replace("{{STATUS}}", &status)
        .replace("{{BODY}}", body)
}

fn input(label: &str, name: &str, kind: &str, value: &str, extra: &str) -> String {
    format!(
        r#"<label>{label}<input type="{kind}" name="{name}" value="{value}" {extra}/></label>"#,
        label = escape(label),
        value = escape(value),
    )
}

fn textarea(label: &str, name: &str, value: &str) -> String {
    format!(
        r#"<label>{}<textarea name="{name}" rows="2">{}</textarea></label>"#,
        escape(label),
        escape(value)
    )
}

fn checkbox(label: &str, name: &str, checked: bool) -> String {
    let checked = if checked { " checked" } else { "" };
    format!(r#"<label class="check"><input type="checkbox" name="{name}"{checked}/>{}</label>"#, escape(label))
}

fn select(label: &str, name: &str, options: &[&str], selected: &str) -> String {
    let options: String = options
        .iter()
        .map(|option| {
            let mark = if *option == selected { " selected" } else { "" };
            format!(r#"<option{mark}>{}</option>"#, escape(option))
        })
        .collect();
    format!(r#"<label>{}<select name="{name}">{options}</select></label>"#, escape(label))
}

fn form(action: &str, title: &str, fields: &[String], button: &str) -> String {
    format!(
        r#"<form class="card" method="post" action="{action}"><h3>{}</h3>{}<button type="submit">{}</button></form>"#,
        escape(title),
        fields.concat(),
        escape(button)
    )
}

fn load_form(path: &str, title: &str, label: &str, current: Option<&str>, button: &str) -> String {
    format!(
        r#"<form class="card" method="get" action="{path}"><h3>{}</h3>{}<button type="submit">{}</button></form>"#,
        escape(title),
        input(label, "edit", "text", current.unwrap_or(""), "required"),
        escape(button)
    )
}

fn rows_table(header: &[String], rows: &[RowView], edit_path: &str, key_column: &str) -> String {
    if rows.is_empty() {
        return r#"<p class="hint">No entries found.</p>"#.to_string();
    }
    let head: String = header.iter().map(|h| format!("<th>{}</th>", escape(h))).collect();
    let body: String = rows
        .iter()
        .map(|row| {
            let cells: String = header
                .iter()
                .map(|h| format!("<td>{}</td>", escape(&row.record.cell(h))))
                .collect();
            format!(
                r#"<tr><td class="addr">{}</td>{cells}<td><a href="{edit_path}?edit={}">Edit</a></td></tr>"#,
                row.address,
                encode_query(&row.record.cell(key_column)),
            )
        })
        .collect();
    format!(r#"<div class="table-wrap"><table><thead><tr><th>Row</th>{head}<th></th></tr></thead><tbody>{body}</tbody></table></div>"#)
}

pub fn render_index() -> String {
    let body = r#"
    <section class="panel">
      <a class="stat link" href="/daily"><span class="label">Daily tracker</span><span class="value">Health metrics</span></a>
      <a class="stat link" href="/tasks"><span class="label">Task tracker</span><span class="value">Open tasks</span></a>
    </section>
    <p class="hint">Rows live in the configured spreadsheet; every page reads it fresh.</p>"#;
    page("Health & Task Tracker", None, body)
}

fn daily_fields(layout: DailyLayout, record: Option<&Record>, date_locked: bool) -> Vec<String> {
    let value = |column: &str| record.map(|r| r.cell(column)).unwrap_or_default();
    let date_extra = if date_locked { "required readonly" } else { "required" };
    let mut fields = vec![input("Date", "date", "date", &value(daily::DATE), date_extra)];
    match layout {
        DailyLayout::Detailed => {
            let or = |column: &str, default: &str| {
                let current = value(column);
                if current.is_empty() { default.to_string() } else { current }
            };
            let weight = r#"min="30" max="200" step="0.1" required"#;
            fields.push(input("Target weight", "target_weight", "number", &value(daily::TARGET_WEIGHT), weight));
            fields.push(input("Current weight", "current_weight", "number", &value(daily::CURRENT_WEIGHT), weight));
            fields.push(input("Steps walked", "steps", "number", &or(daily::STEPS, "0"), r#"min="0" step="1""#));
            fields.push(checkbox("Yoga done?", "yoga", value(daily::YOGA) == "Yes"));
            fields.push(checkbox("Breathing done?", "breathing", value(daily::BREATHING) == "Yes"));
            fields.push(input("Blood pressure", "blood_pressure", "text", &or(daily::BLOOD_PRESSURE, "120/80"), ""));
            fields.push(input("Fasting sugar", "fasting_sugar", "text", &or(daily::FASTING_SUGAR, "95"), ""));
            fields.push(input("Mood / journal", "mood_journal", "text", &value(daily::MOOD_JOURNAL), ""));
            fields.push(textarea("Comments", "comments", &value(daily::COMMENTS)));
        }
        DailyLayout::Simple => {
            fields.push(input("Parameter", "parameter", "text", &value(daily::PARAMETER), "required"));
            fields.push(input("Value", "value", "text", &value(daily::VALUE), ""));
            fields.push(textarea("Notes", "notes", &value(daily::NOTES)));
        }
    }
    fields
}

pub fn render_daily(
    schema: &TableSchema,
    layout: DailyLayout,
    rows: &[RowView],
    editing: Option<&Record>,
    edit_key: Option<&str>,
    notice: Option<Notice<'_>>,
) -> String {
    let latest = rows
        .iter()
        .map(|row| row.record.cell(daily::DATE))
        .max()
        .unwrap_or_else(|| "--".to_string());
    let mut body = format!(
        r#"<section class="panel">
      <div class="stat"><span class="label">Entries</span><span class="value">{}</span></div>
      <div class="stat"><span class="label">Latest date</span><span class="value">{}</span></div>
    </section>"#,
        rows.len(),
        escape(&latest)
    );

    if layout == DailyLayout::Detailed {
        body.push_str(CHART_HTML);
    }

    body.push_str("<h2>Entries</h2>");
    body.push_str(&rows_table(&schema.header(), rows, "/daily", daily::DATE));

    body.push_str(r#"<section class="forms">"#);
    body.push_str(&form("/daily/add", "Add entry", &daily_fields(layout, None, false), "Submit"));

    body.push_str(&load_form("/daily", "Update entry", "Date to update (YYYY-MM-DD)", edit_key, "Load entry"));
    match (editing, edit_key) {
        (Some(record), _) => body.push_str(&form(
            "/daily/update",
            "Edit loaded entry",
            &daily_fields(layout, Some(record), true),
            "Update",
        )),
        (None, Some(key)) => body.push_str(&format!(
            r#"<p class="status" data-type="error">No entry for {}.</p>"#,
            escape(key)
        )),
        (None, None) => {}
    }

    body.push_str(&form(
        "/daily/delete",
        "Delete entry",
        &[input("Date to delete (YYYY-MM-DD)", "date", "text", "", "required")],
        "Delete entry",
    ));
    body.push_str("</section>");

    page("Daily Tracker", notice, &body)
}

fn task_fields(layout: TaskLayout, record: Option<&Record>) -> Vec<String> {
    let value = |column: &str| record.map(|r| r.cell(column)).unwrap_or_default();
    let categories: String = tasks::CATEGORIES
        .iter()
        .map(|c| format!(r#"<option value="{}">"#, escape(c)))
        .collect();
    vec![
        input("Add date", "add_date", "date", &value(tasks::ADD_DATE), ""),
        input("Task", "task", "text", &value(tasks::TASK), "required"),
        input("Target date", "target_date", "date", &value(tasks::TARGET_DATE), ""),
        format!(
            r#"{}<datalist id="categories">{categories}</datalist>"#,
            input("Category", "category", "text", &value(tasks::TASK_CATEGORY), r#"list="categories""#)
        ),
        select("Task type", "task_type", &tasks::TYPES, &value(tasks::TASK_TYPE)),
        select("Status", "status", &tasks::STATUSES, &value(layout.status_column())),
        textarea("Comments", "comments", &value(tasks::COMMENTS)),
    ]
}

pub fn render_tasks(
    layout: TaskLayout,
    rows: &[RowView],
    board: &BoardResponse,
    editing: Option<&Record>,
    edit_key: Option<&str>,
    notice: Option<Notice<'_>>,
) -> String {
    let header = layout.schema().header();
    let mut body = String::from("<h2>Task dashboard</h2>");
    if board.groups.is_empty() {
        body.push_str(r#"<p class="hint">No pending or in-progress tasks.</p>"#);
    }
    for group in &board.groups {
        body.push_str(&format!("<h3>{}</h3>", escape(&group.category)));
        body.push_str(&rows_table(&header, &group.rows, "/tasks", tasks::TASK));
    }

    body.push_str("<h2>All tasks</h2>");
    body.push_str(&rows_table(&header, rows, "/tasks", tasks::TASK));

    body.push_str(r#"<section class="forms">"#);
    body.push_str(&form("/tasks/add", "Add task", &task_fields(layout, None), "Add task"));

    body.push_str(&load_form("/tasks", "Modify task", "Task name", edit_key, "Load task"));
    match (editing, edit_key) {
        (Some(record), _) => {
            let mut fields = vec![format!(
                r#"<input type="hidden" name="key" value="{}"/>"#,
                escape(&record.cell(tasks::TASK))
            )];
            fields.extend(task_fields(layout, Some(record)));
            body.push_str(&form("/tasks/update", "Edit loaded task", &fields, "Update task"));
        }
        (None, Some(key)) => body.push_str(&format!(
            r#"<p class="status" data-type="error">No task named {}.</p>"#,
            escape(key)
        )),
        (None, None) => {}
    }

    let names: Vec<String> = rows.iter().map(|row| row.record.cell(tasks::TASK)).collect();
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    if !names.is_empty() {
        body.push_str(&form(
            "/tasks/delete",
            "Delete task",
            &[select("Task to delete", "task", &names, "")],
            "Delete task",
        ));
    }
    body.push_str("</section>");

    page("Task Tracker", notice, &body)
}

const CHART_HTML: &str = r#"
    <section class="chart-area">
      <div class="chart-header">
        <h2>Progress vs target</h2>
        <p class="subtitle">Weight (kg) by date; dashed line is the target.</p>
      </div>
      <div class="chart-card">
        <svg id="chart" viewBox="0 0 600 260" aria-label="Weight chart" role="img"></svg>
      </div>
    </section>
    <script>
      const chartEl = document.getElementById('chart');

      const renderChart = (points) => {
        if (!points.length) {
          chartEl.innerHTML = '<text class="chart-label" x="50%" y="50%" text-anchor="middle">No data yet</text>';
          return;
        }
        const width = 600;
        const height = 260;
        const paddingX = 44;
        const paddingY = 34;
        const top = 24;
        const values = points.flatMap((p) => [p.target, p.current]);
        let min = Math.min(...values);
        let max = Math.max(...values);
        if (min === max) {
          min -= 1;
          max += 1;
        }
        const range = max - min;
        const xStep = points.length > 1 ? (width - paddingX * 2) / (points.length - 1) : 0;
        const scaleY = (height - top - paddingY) / range;
        const x = (i) => paddingX + i * xStep;
        const y = (v) => height - paddingY - (v - min) * scaleY;
        const path = (key) => points
          .map((p, i) => `${i === 0 ? 'M' : 'L'} ${x(i).toFixed(2)} ${y(p[key]).toFixed(2)}`)
          .join(' ');

        let grid = '';
        for (let i = 0; i <= 4; i += 1) {
          const value = min + (range * i) / 4;
          grid += `<line class="chart-grid" x1="${paddingX}" y1="${y(value)}" x2="${width - paddingX}" y2="${y(value)}" />`;
          grid += `<text class="chart-label" x="${paddingX - 10}" y="${y(value) + 4}" text-anchor="end">${value.toFixed(1)}</text>`;
        }
        const every = points.length > 8 ? Math.ceil(points.length / 8) : 1;
        const labels = points
          .map((p, i) => i % every ? '' : `<text class="chart-label" x="${x(i)}" y="${height - paddingY + 18}" text-anchor="middle">${p.date.slice(5)}</text>`)
          .join('');
        const circles = points
          .map((p, i) => `<circle class="chart-point" cx="${x(i)}" cy="${y(p.current)}" r="4" />`)
          .join('');
        chartEl.innerHTML = `${grid}<path class="chart-target" d="${path('target')}" /><path class="chart-line" d="${path('current')}" />${circles}${labels}`;
      };

      fetch('/api/progress')
        .then((res) => res.ok ? res.json() : Promise.reject(new Error('Unable to load progress')))
        .then((data) => renderChart(data.points))
        .catch(() => renderChart([]));
    </script>"#;

const PAGE_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>{{TITLE}}</title>
  <style>
    :root {
      --bg-1: #f8f3e6;
      --bg-2: #f5d3a7;
      --ink: #2b2a28;
      --accent: #ff6b4a;
      --accent-2: #2f4858;
      --card: rgba(255, 255, 255, 0.86);
      --shadow: 0 24px 60px rgba(47, 72, 88, 0.18);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: linear-gradient(135deg, var(--bg-1), #ffe9d4 60%, #f9f2e9 100%);
      color: var(--ink);
      font-family: "Trebuchet MS", sans-serif;
      padding: 32px 18px 48px;
    }

    .app {
      width: min(1100px, 100%);
      margin: 0 auto;
      background: var(--card);
      border-radius: 28px;
      box-shadow: var(--shadow);
      padding: 36px;
      display: grid;
      gap: 24px;
    }

    nav {
      display: flex;
      gap: 18px;
    }

    nav a, a {
      color: var(--accent-2);
      font-weight: 600;
    }

    h1 {
      font-family: "Georgia", serif;
      margin: 0;
    }

    .panel, .forms {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(240px, 1fr));
      gap: 16px;
    }

    .stat, .card {
      background: white;
      border-radius: 18px;
      padding: 18px;
      border: 1px solid rgba(47, 72, 88, 0.08);
      display: grid;
      gap: 8px;
      text-decoration: none;
    }

    .stat .label {
      font-size: 0.85rem;
      text-transform: uppercase;
      letter-spacing: 0.12em;
      color: #8b857d;
    }

    .stat .value {
      font-size: 1.5rem;
      font-weight: 600;
      color: var(--accent-2);
    }

    label {
      display: grid;
      gap: 4px;
      font-size: 0.9rem;
    }

    label.check {
      display: flex;
      align-items: center;
      gap: 8px;
    }

    input, select, textarea {
      font: inherit;
      padding: 8px 10px;
      border-radius: 10px;
      border: 1px solid rgba(47, 72, 88, 0.2);
    }

    button {
      border: none;
      border-radius: 999px;
      padding: 12px 18px;
      font-weight: 600;
      cursor: pointer;
      background: var(--accent);
      color: white;
    }

    .table-wrap {
      overflow-x: auto;
    }

    table {
      border-collapse: collapse;
      width: 100%;
      background: white;
      border-radius: 12px;
      font-size: 0.9rem;
    }

    th, td {
      padding: 8px 10px;
      border-bottom: 1px solid rgba(47, 72, 88, 0.08);
      text-align: left;
    }

    td.addr {
      color: #8b857d;
    }

    .chart-card {
      background: white;
      border-radius: 20px;
      padding: 16px;
    }

    #chart {
      width: 100%;
      height: 260px;
      display: block;
    }

    .chart-line {
      fill: none;
      stroke: var(--accent);
      stroke-width: 3;
    }

    .chart-target {
      fill: none;
      stroke: var(--accent-2);
      stroke-width: 2;
      stroke-dasharray: 6 6;
    }

    .chart-point {
      fill: white;
      stroke: var(--accent);
      stroke-width: 2;
    }

    .chart-grid {
      stroke: rgba(47, 72, 88, 0.12);
    }

    .chart-label {
      fill: #7a746d;
      font-size: 11px;
    }

    .status {
      font-size: 0.95rem;
      color: #6b645d;
    }

    .status[data-type="error"] {
      color: #c63b2b;
    }

    .status[data-type="ok"] {
      color: #2d7a4b;
    }

    .hint, .subtitle {
      margin: 0;
      color: #6f6a65;
      font-size: 0.9rem;
    }
  </style>
</head>
<body>
  <main class="app">
    <header>
      <h1>{{TITLE}}</h1>
      <nav><a href="/">Home</a><a href="/daily">Daily tracker</a><a href="/tasks">Task tracker</a></nav>
    </header>
    {{STATUS}}
    {{BODY}}
  </main>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RowAddress;

    #[test]
    fn escape_neutralises_markup() {
        assert_eq!(escape(r#"<b>"x" & 'y'</b>"#), "&lt;b&gt;&quot;x&quot; &amp; &#39;y&#39;&lt;/b&gt;");
    }

    #[test]
    fn daily_page_lists_rows_and_prefills_edit_form() {
        let schema = DailyLayout::Simple.schema();
        let record = Record::new()
            .with("DATE", "2025-01-01")
            .with("PARAMETER", "<sleep>")
            .with("VALUE", "7h")
            .with("NOTES", "");
        let rows = vec![RowView { address: RowAddress(2), record: record.clone() }];

        let html = render_daily(&schema, DailyLayout::Simple, &rows, Some(&record), Some("2025-01-01"), None);
        assert!(html.contains("&lt;sleep&gt;"));
        assert!(html.contains(r#"action="/daily/update""#));
        assert!(html.contains(r#"href="/daily?edit=2025-01-01""#));
        assert!(!html.contains("id=\"chart\""));
    }

    #[test]
    fn missing_edit_target_is_reported() {
        let schema = DailyLayout::Detailed.schema();
        let html = render_daily(&schema, DailyLayout::Detailed, &[], None, Some("2030-01-01"), Some(Notice::Ok("saved")));
        assert!(html.contains("No entry for 2030-01-01."));
        assert!(html.contains(r#"data-type="ok">saved<"#));
        assert!(html.contains("id=\"chart\""));
    }

    #[test]
    fn task_edit_form_preselects_current_values() {
        let record = Record::new()
            .with("ADD_DATE", "2025-01-01")
            .with("TASK", "file taxes")
            .with("TARGET_DATE", "2025-04-15")
            .with("TASK_CATEGORY", "Personal")
            .with("TASK_TYPE", "Urgent")
            .with("STATUS", "In Progress")
            .with("COMMENTS", "");
        let rows = vec![RowView { address: RowAddress(2), record: record.clone() }];
        let board = crate::dashboard::build_board(&rows, "STATUS");

        let html = render_tasks(TaskLayout::StatusLast, &rows, &board, Some(&record), Some("file taxes"), None);
        assert!(html.contains(r#"<input type="hidden" name="key" value="file taxes"/>"#));
        assert!(html.contains("<option selected>Urgent</option>"));
        assert!(html.contains("<option selected>In Progress</option>"));
        assert!(html.contains("<h3>Personal</h3>"));
    }
}
