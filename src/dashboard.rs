//! HTML dashboard served at `/`.
//!
//! Rendered once per request from the current state; the page then polls
//! `/status` and `/logs` every few seconds. Purely presentational.

use edison_core::state::{ConnectionState, Phase};

const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>Edison WhatsApp Bot</title>
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <style>
    * { margin: 0; padding: 0; box-sizing: border-box; }
    body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
           background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
           min-height: 100vh; padding: 20px; color: #333; }
    .container { max-width: 1000px; margin: 0 auto; background: white; border-radius: 20px;
                 box-shadow: 0 20px 60px rgba(0,0,0,0.3); overflow: hidden; }
    .header { background: linear-gradient(135deg, #4f46e5 0%, #7c3aed 100%); color: white;
              padding: 40px; text-align: center; }
    .header h1 { font-size: 2.2rem; margin-bottom: 10px; }
    .badge { display: inline-block; padding: 8px 20px; background: rgba(255,255,255,0.2);
             border-radius: 50px; font-size: 0.9rem; margin-top: 10px; }
    .dot { display: inline-block; width: 10px; height: 10px; border-radius: 50%;
           margin-right: 8px; background: #94a3b8; }
    .status-connected { background: #10b981; }
    .status-pairing, .status-connecting, .status-reconnecting { background: #f59e0b; }
    .status-error { background: #ef4444; }
    .content { padding: 40px; }
    .grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(300px, 1fr)); gap: 30px; }
    .card { background: #f8fafc; border-radius: 15px; padding: 30px; border: 1px solid #e2e8f0; }
    .card h3 { color: #4f46e5; margin-bottom: 20px; font-size: 1.3rem; }
    input { width: 100%; padding: 12px; border: 2px solid #e2e8f0; border-radius: 10px;
            font-size: 1rem; margin-bottom: 15px; }
    button { width: 100%; padding: 12px; border: none; border-radius: 10px; color: white;
             background: #4f46e5; font-size: 1rem; cursor: pointer; }
    button:disabled { opacity: 0.6; cursor: wait; }
    .row { display: flex; gap: 10px; margin-top: 15px; }
    .code { font-size: 2rem; font-weight: 700; letter-spacing: 4px; text-align: center;
            color: #4f46e5; margin: 15px 0; }
    .response { margin-top: 15px; padding: 12px; border-radius: 10px; display: none; }
    .response.success { background: #d1fae5; color: #065f46; }
    .response.error { background: #fee2e2; color: #991b1b; }
    .endpoint { display: flex; justify-content: space-between; padding: 6px 0;
                border-bottom: 1px solid #e2e8f0; font-size: 0.9rem; }
    .method { font-weight: 700; color: #4f46e5; }
    #activityLogs { background: #0f172a; color: #94a3b8; padding: 20px; border-radius: 10px;
                    font-family: 'Courier New', monospace; height: 220px; overflow-y: auto;
                    font-size: 0.9rem; }
    .footer { text-align: center; padding: 20px; color: #64748b; font-size: 0.85rem; }
  </style>
</head>
<body>
  <div class="container">
    <div class="header">
      <h1>🤖 Edison WhatsApp Bot</h1>
      <div class="badge" id="statusDisplay">
        <span class="dot status-{{PHASE}}"></span>Status: {{PHASE_UPPER}}{{PHONE_LINE}}
      </div>
    </div>
    <div class="content">
      <div class="grid">
        <div class="card">
          <h3>🔗 Pair Device</h3>
          <form id="pairForm">
            <input id="phoneNumber" placeholder="Phone number with country code, e.g. 5511999887766"
                   pattern="[0-9]{10,15}" required>
            <button id="pairBtn" type="submit">Generate Pairing Code</button>
          </form>
          <div id="codeResult" style="display: {{CODE_DISPLAY}};">
            <div class="code" id="pairingCodeDisplay">{{CODE}}</div>
            <p>Open WhatsApp → Linked Devices → Link with phone number and enter this code.</p>
          </div>
          <div class="response" id="pairResponse"></div>
        </div>
        <div class="card">
          <h3>🎛️ Bot Control</h3>
          <p id="statusText" style="font-size: 1.2rem; font-weight: 600;">{{STATUS_TEXT}}</p>
          <p id="lastUpdate" style="color: #64748b;">Last update: {{LAST_UPDATE}}</p>
          <div class="row">
            <button onclick="checkStatus()" style="background: #3b82f6;">Refresh Status</button>
            <button id="disconnectBtn" onclick="disconnectBot()"
                    style="background: #ef4444; display: {{DISCONNECT_DISPLAY}};">Disconnect</button>
          </div>
          <div style="margin-top: 25px;">
            <div class="endpoint"><span>Health Check</span><span class="method">GET</span><code>/health</code></div>
            <div class="endpoint"><span>Bot Status</span><span class="method">GET</span><code>/status</code></div>
            <div class="endpoint"><span>Pair Device</span><span class="method">POST</span><code>/pair</code></div>
            <div class="endpoint"><span>Disconnect</span><span class="method">POST</span><code>/disconnect</code></div>
            <div class="endpoint"><span>Send Message</span><span class="method">POST</span><code>/send</code></div>
            <div class="endpoint"><span>Chats</span><span class="method">GET</span><code>/chats</code></div>
          </div>
        </div>
      </div>
      <div class="card" style="margin-top: 30px;">
        <h3>🖥️ Recent Activity</h3>
        <div id="activityLogs">{{LOGS}}</div>
        <div class="row">
          <button onclick="clearLogs()" style="background: #64748b;">Clear Logs</button>
          <button onclick="refreshLogs()" style="background: #3b82f6;">Refresh Logs</button>
        </div>
      </div>
    </div>
    <div class="footer">Edison v{{VERSION}} · port {{PORT}}</div>
  </div>
  <script>
    const statusText = (s) => s === 'connected' ? 'Bot is Active'
      : s === 'pairing' ? 'Waiting for Pairing'
      : s === 'connecting' ? 'Connecting...'
      : s === 'reconnecting' ? 'Reconnecting...'
      : s === 'error' ? 'Connection Error'
      : 'Ready to Connect';

    async function checkStatus() {
      try {
        const data = await (await fetch('/status')).json();
        const badge = document.getElementById('statusDisplay');
        badge.textContent = '';
        const dot = document.createElement('span');
        dot.className = 'dot status-' + data.status;
        badge.appendChild(dot);
        badge.appendChild(document.createTextNode('Status: ' + data.status.toUpperCase()
          + (data.phone ? ' · ' + data.phone : '')));
        document.getElementById('statusText').textContent = statusText(data.status);
        document.getElementById('lastUpdate').textContent =
          'Last update: ' + new Date(data.timestamp).toLocaleTimeString();
        document.getElementById('disconnectBtn').style.display =
          data.status === 'connected' ? 'block' : 'none';
        if (data.pairingCode) {
          document.getElementById('pairingCodeDisplay').textContent = data.pairingCode;
          document.getElementById('codeResult').style.display = 'block';
        }
      } catch (e) { console.error('Status check failed:', e); }
    }

    async function refreshLogs() {
      try {
        const data = await (await fetch('/logs')).json();
        const logs = document.getElementById('activityLogs');
        logs.textContent = '';
        for (const line of data.logs) {
          const div = document.createElement('div');
          div.textContent = line;
          logs.appendChild(div);
        }
        logs.scrollTop = logs.scrollHeight;
      } catch (e) { console.error('Failed to refresh logs:', e); }
    }

    function showResponse(type, message) {
      const div = document.getElementById('pairResponse');
      div.className = 'response ' + type;
      div.textContent = message;
      div.style.display = 'block';
    }

    async function disconnectBot() {
      if (!confirm('Are you sure you want to disconnect the bot?')) return;
      try {
        const data = await (await fetch('/disconnect', { method: 'POST' })).json();
        showResponse('success', data.message || 'Disconnected successfully');
        document.getElementById('codeResult').style.display = 'none';
        setTimeout(checkStatus, 1000);
      } catch (e) { showResponse('error', 'Failed to disconnect: ' + e.message); }
    }

    function clearLogs() {
      if (!confirm('Clear all activity logs?')) return;
      fetch('/logs/clear', { method: 'POST' }).then(refreshLogs);
    }

    document.getElementById('pairForm').addEventListener('submit', async (e) => {
      e.preventDefault();
      const phoneNumber = document.getElementById('phoneNumber').value.trim();
      if (!/^[0-9]{10,15}$/.test(phoneNumber)) {
        showResponse('error', 'Please enter a valid phone number (10-15 digits)');
        return;
      }
      const btn = document.getElementById('pairBtn');
      btn.disabled = true;
      btn.textContent = 'Generating Code...';
      try {
        const res = await fetch('/pair', {
          method: 'POST',
          headers: { 'Content-Type': 'application/json' },
          body: JSON.stringify({ phoneNumber })
        });
        const data = await res.json();
        if (data.success && data.pairingCode) {
          document.getElementById('pairingCodeDisplay').textContent = data.pairingCode;
          document.getElementById('codeResult').style.display = 'block';
          showResponse('success', 'Pairing code generated successfully!');
        } else if (data.success) {
          showResponse('success', data.message);
        } else {
          showResponse('error', data.error || data.message || 'Failed to generate pairing code');
        }
      } catch (err) {
        showResponse('error', 'Network error: ' + err.message);
      } finally {
        btn.disabled = false;
        btn.textContent = 'Generate Pairing Code';
        checkStatus();
      }
    });

    setInterval(checkStatus, 3000);
    setInterval(refreshLogs, 5000);
    checkStatus();
    refreshLogs();
  </script>
</body>
</html>
"#;

/// Render the dashboard for the given state and activity log.
pub fn render(state: &ConnectionState, logs: &[String], port: u16) -> String {
    let phase = state.phase();
    let phone_line = state
        .remote_identity()
        .map(|p| format!(" · {}", escape_html(p)))
        .unwrap_or_default();
    let code = state.pairing_code().map(escape_html).unwrap_or_default();
    let logs: String = logs
        .iter()
        .map(|line| format!("<div>{}</div>", escape_html(line)))
        .collect();

    PAGE.replace("{{PHASE}}", phase.as_str())
        .replace("{{PHASE_UPPER}}", &phase.as_str().to_uppercase())
        .replace("{{PHONE_LINE}}", &phone_line)
        .replace("{{CODE_DISPLAY}}", if code.is_empty() { "none" } else { "block" })
        .replace("{{CODE}}", &code)
        .replace("{{STATUS_TEXT}}", status_text(phase))
        .replace(
            "{{LAST_UPDATE}}",
            &state
                .last_transition_at()
                .with_timezone(&chrono::Local)
                .format("%H:%M:%S")
                .to_string(),
        )
        .replace(
            "{{DISCONNECT_DISPLAY}}",
            if phase == Phase::Connected { "block" } else { "none" },
        )
        .replace("{{VERSION}}", env!("CARGO_PKG_VERSION"))
        .replace("{{PORT}}", &port.to_string())
        .replace("{{LOGS}}", &logs)
}

fn status_text(phase: Phase) -> &'static str {
    match phase {
        Phase::Connected => "Bot is Active",
        Phase::Pairing => "Waiting for Pairing",
        Phase::Connecting => "Connecting...",
        Phase::Reconnecting => "Reconnecting...",
        Phase::Error => "Connection Error",
        Phase::Disconnected => "Ready to Connect",
    }
}

/// Minimal escaping for text placed inside HTML elements.
fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
