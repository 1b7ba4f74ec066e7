use serde::Serialize;

use crate::config::Config;

/// Values the page script needs from the server configuration.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PageConfig<'a> {
    stream_url: &'a str,
    station_name: &'a str,
    program_fallback: &'a str,
    song_fallback: &'a str,
    avatar_imager_url: &'a str,
}

const CONFIG_PLACEHOLDER: &str = "__PLAYER_CONFIG__";

/// Renders the player page with the configuration inlined as a JSON object.
pub fn render(config: &Config) -> anyhow::Result<String> {
    let page_config = PageConfig {
        stream_url: &config.stream_url,
        station_name: &config.fallbacks.station_name,
        program_fallback: &config.fallbacks.program,
        song_fallback: &config.fallbacks.song,
        avatar_imager_url: &config.avatar_imager_url,
    };
    // `</` would close the surrounding <script> element.
    let json = serde_json::to_string(&page_config)?.replace("</", "<\\/");
    Ok(PAGE.replace(CONFIG_PLACEHOLDER, &json))
}

const PAGE: &str = r#"<!DOCTYPE html>
<html lang="pt-BR">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Rádio</title>
    <style>
        :root {
            --primary: #7c3aed;
            --secondary: #db2777;
            --bg: #14111f;
            --surface: #221d33;
            --text: #e8e6f0;
            --muted: #9b95b0;
        }
        body {
            background-color: var(--bg);
            color: var(--text);
            font-family: system-ui, -apple-system, sans-serif;
            display: flex;
            flex-direction: column;
            align-items: center;
            justify-content: center;
            min-height: 100vh;
            margin: 0;
        }
        header, footer { color: var(--muted); font-size: 0.9rem; margin: 1rem 0; }
        header h1 { margin: 0; color: var(--primary); font-weight: 700; letter-spacing: -0.5px; }
        .player-container {
            background: var(--surface);
            padding: 2rem;
            border-radius: 1rem;
            box-shadow: 0 10px 30px rgba(0,0,0,0.5);
            text-align: center;
            width: 90%;
            max-width: 420px;
        }
        .avatar {
            position: relative;
            width: 112px;
            height: 112px;
            margin: 0 auto 1rem auto;
            border-radius: 50%;
            overflow: hidden;
            background: linear-gradient(135deg, var(--primary), var(--secondary));
            display: flex;
            align-items: center;
            justify-content: center;
            font-size: 2.5rem;
            font-weight: bold;
            color: #fff;
        }
        .avatar.live { box-shadow: 0 0 0 3px rgba(124, 58, 237, 0.5), 0 0 24px rgba(219, 39, 119, 0.4); }
        .avatar img { width: 100%; height: 100%; object-fit: cover; }
        .live-dot {
            display: inline-block; width: 10px; height: 10px; border-radius: 50%;
            background: #555; margin-right: 6px; vertical-align: middle;
        }
        .live-dot.online { background: #ef4444; animation: pulse 1s infinite; }
        @keyframes pulse { 50% { transform: scale(1.3); } }
        .meta { margin-bottom: 1.5rem; }
        .meta h2 { margin: 0; font-size: 1.4rem; color: #fff; }
        .meta p { margin: 0.5rem 0 0; color: var(--muted); }
        .meta .song { color: var(--secondary); font-weight: 500; }
        .stats {
            display: flex; justify-content: center; gap: 1rem; align-items: center;
            margin-bottom: 1.5rem;
        }
        .pill {
            padding: 0.4rem 1rem; border-radius: 999px; background: rgba(219, 39, 119, 0.15);
            color: var(--secondary); font-weight: 500;
        }
        .controls { display: flex; gap: 1rem; justify-content: center; }
        button {
            background: var(--primary);
            border: none;
            border-radius: 50%;
            width: 56px;
            height: 56px;
            cursor: pointer;
            color: #fff;
            display: flex;
            align-items: center;
            justify-content: center;
            transition: transform 0.1s, filter 0.1s;
        }
        button:hover { filter: brightness(1.1); transform: scale(1.05); }
        button:active { transform: scale(0.95); }
        button:disabled { opacity: 0.5; cursor: wait; }
        button svg { width: 26px; height: 26px; fill: currentColor; }
        .love { background: none; color: var(--secondary); width: auto; height: auto; font-size: 1rem; gap: 4px; }
        .love svg { width: 20px; height: 20px; }
        .volume-container {
            display: flex;
            align-items: center;
            gap: 10px;
            width: 100%;
            margin-top: 1.5rem;
            color: var(--primary);
        }
        .volume-container svg { width: 24px; height: 24px; fill: currentColor; }
        input[type=range] { flex-grow: 1; accent-color: var(--primary); cursor: pointer; }
    </style>
</head>
<body>
    <header><h1 id="stationTitle">Rádio</h1></header>

    <div class="player-container">
        <div class="avatar" id="avatar"><span id="avatarInitial">R</span></div>
        <div class="meta">
            <h2><span class="live-dot" id="liveDot"></span><span id="djName">...</span></h2>
            <p id="program">...</p>
            <p class="song" id="song"></p>
        </div>
        <div class="stats">
            <span class="pill"><span id="listeners">0</span> ouvintes</span>
            <button class="love" id="loveBtn" title="Amei!" hidden>
                <svg viewBox="0 0 24 24"><path d="M12 21.35l-1.45-1.32C5.4 15.36 2 12.28 2 8.5 2 5.42 4.42 3 7.5 3c1.74 0 3.41.81 4.5 2.09C13.09 3.81 14.76 3 16.5 3 19.58 3 22 5.42 22 8.5c0 3.78-3.4 6.86-8.55 11.54L12 21.35z"/></svg>
                <span id="loveCount">0</span>
            </button>
        </div>
        <div class="controls">
            <button id="playBtn" title="Tocar/Pausar">
                <svg viewBox="0 0 24 24"><path d="M8 5v14l11-7z"/></svg>
            </button>
        </div>
        <div class="volume-container">
            <svg viewBox="0 0 24 24"><path d="M3 9v6h4l5 5V4L7 9H3zm13.5 3c0-1.77-1.02-3.29-2.5-4.03v8.05c1.48-.73 2.5-2.25 2.5-4.02z"/></svg>
            <input type="range" id="volumeSlider" min="0" max="1" step="0.01" value="0.7">
        </div>
        <audio id="audio" preload="none"></audio>
    </div>

    <footer id="footer"></footer>

    <script>
        const CONFIG = __PLAYER_CONFIG__;
        const STATUS_POLL_MS = 10000;
        const FORCED_RECONNECT_MS = 10 * 60 * 1000;
        const LOVE_COOLDOWN_MS = 30000;

        const audio = document.getElementById('audio');
        const playBtn = document.getElementById('playBtn');
        const volumeSlider = document.getElementById('volumeSlider');
        const avatar = document.getElementById('avatar');
        const liveDot = document.getElementById('liveDot');
        const djName = document.getElementById('djName');
        const program = document.getElementById('program');
        const song = document.getElementById('song');
        const listeners = document.getElementById('listeners');
        const loveBtn = document.getElementById('loveBtn');
        const loveCount = document.getElementById('loveCount');

        const playIcon = '<svg viewBox="0 0 24 24"><path d="M8 5v14l11-7z"/></svg>';
        const pauseIcon = '<svg viewBox="0 0 24 24"><path d="M6 19h4V5H6v14zm8-14v14h4V5h-4z"/></svg>';

        document.title = CONFIG.stationName;
        document.getElementById('stationTitle').textContent = CONFIG.stationName;
        document.getElementById('footer').textContent = '© ' + new Date().getFullYear() + ' ' + CONFIG.stationName;

        let isPlaying = false;
        let currentDj = null;
        audio.volume = parseFloat(volumeSlider.value);

        const OFFLINE = {
            locutor: CONFIG.stationName,
            programa: CONFIG.programFallback,
            musica: CONFIG.songFallback,
            unicos: 0,
            status: 'offline',
        };

        function isLive(status) {
            return !!status.locutor && status.locutor.trim() !== '' && status.locutor !== CONFIG.stationName;
        }

        function renderAvatar(name, live) {
            avatar.classList.toggle('live', live);
            avatar.innerHTML = '';
            const initial = document.createElement('span');
            initial.textContent = name.charAt(0).toUpperCase();
            if (!live) {
                avatar.appendChild(initial);
                return;
            }
            const img = document.createElement('img');
            img.alt = 'Avatar de ' + name;
            img.src = CONFIG.avatarImagerUrl + '?user=' + encodeURIComponent(name) +
                '&action=wav&size=l&head_direction=3&direction=3&gesture=sml';
            img.onerror = () => { avatar.innerHTML = ''; avatar.appendChild(initial); };
            avatar.appendChild(img);
        }

        function render(status) {
            const live = isLive(status);
            const dj = live ? status.locutor : CONFIG.stationName;
            djName.textContent = dj;
            program.textContent = live ? status.programa : CONFIG.programFallback;
            song.textContent = status.musica || '';
            listeners.textContent = status.unicos || 0;
            liveDot.classList.toggle('online', status.status === 'online');
            if (dj !== currentDj) {
                currentDj = dj;
                renderAvatar(dj, live);
                renderLove(live ? dj : null);
            }
        }

        async function updateStatus() {
            try {
                const r = await fetch('/api/status', { cache: 'no-store' });
                if (!r.ok) throw new Error('status ' + r.status);
                render(await r.json());
            } catch (e) {
                render(OFFLINE);
            }
        }

        // Love counter, per DJ, stored in the browser only.
        function renderLove(dj) {
            loveBtn.hidden = !dj;
            if (!dj) return;
            loveCount.textContent = parseInt(localStorage.getItem('love_' + dj) || '0', 10);
            const last = parseInt(localStorage.getItem('lastLove_' + dj) || '0', 10);
            loveBtn.disabled = Date.now() - last < LOVE_COOLDOWN_MS;
        }

        loveBtn.addEventListener('click', () => {
            const dj = currentDj;
            const count = parseInt(localStorage.getItem('love_' + dj) || '0', 10) + 1;
            localStorage.setItem('love_' + dj, String(count));
            localStorage.setItem('lastLove_' + dj, String(Date.now()));
            renderLove(dj);
            setTimeout(() => renderLove(currentDj), LOVE_COOLDOWN_MS);
        });

        // Audio
        async function restartStream() {
            if (!isPlaying) return;
            try {
                audio.src = CONFIG.streamUrl;
                audio.load();
                await audio.play();
            } catch (e) {
                console.error('Failed to restart audio stream:', e);
            }
        }

        playBtn.addEventListener('click', async () => {
            if (isPlaying) {
                audio.pause();
                isPlaying = false;
                playBtn.innerHTML = playIcon;
                return;
            }
            playBtn.disabled = true;
            try {
                audio.src = CONFIG.streamUrl;
                audio.load();
                await audio.play();
                isPlaying = true;
                playBtn.innerHTML = pauseIcon;
            } catch (e) {
                console.error('Audio playback error:', e);
            } finally {
                playBtn.disabled = false;
            }
        });

        volumeSlider.addEventListener('input', (e) => {
            audio.volume = parseFloat(e.target.value);
        });

        audio.addEventListener('stalled', restartStream);
        audio.addEventListener('error', restartStream);
        audio.addEventListener('ended', restartStream);

        updateStatus();
        setInterval(updateStatus, STATUS_POLL_MS);
        setInterval(restartStream, FORCED_RECONNECT_MS);
    </script>
</body>
</html>
"#;
