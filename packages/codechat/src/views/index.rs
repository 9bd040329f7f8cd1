use axum::response::{Html, IntoResponse};
use chat_viewer::WELCOME_BANNER;
use maud::{DOCTYPE, Markup, PreEscaped, html};

use super::{CSS, sidebar};

/// The shell never carries contacts: a viewer only learns them from the
/// next `ready` or `message_create` push.
pub async fn index_page() -> impl IntoResponse {
    Html(render_index().into_string())
}

pub fn render_index() -> Markup {
    html! {
        (DOCTYPE)
        html {
            head {
                title { "codechat - Visual Studio Code" }
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                style { (PreEscaped(CSS)) }
            }
            body {
                div class="titlebar" { "chats.json - codechat - Visual Studio Code" }

                div class="workbench" {
                    nav class="activity-bar" {
                        span class="active" title="Explorer" { "\u{2630}" }
                        span title="Search" { "\u{2315}" }
                        span title="Source Control" { "\u{2387}" }
                        span title="Extensions" { "\u{25A6}" }
                    }

                    (sidebar())

                    main class="editor" {
                        div id="tabs" class="tabs" {}
                        textarea id="transcript" class="transcript" readonly spellcheck="false" {
                            (WELCOME_BANNER)
                        }
                        section class="panel" {
                            div class="panel-title" { "TERMINAL" }
                            div class="terminal-line" {
                                span class="terminal-prompt" { "$" }
                                input type="text" id="terminal-input" class="terminal-input"
                                    autocomplete="off" placeholder="Type a message and press Enter";
                            }
                        }
                    }
                }

                footer class="statusbar" {
                    span id="status-connection" { "connecting..." }
                    span id="status-chat" { "No chat open" }
                }

                div id="qr-modal" class="modal" {
                    div class="modal-card" {
                        h3 { "Link your account" }
                        p { "Scan this code with your phone to sign in." }
                        img id="qr-image" alt="Login challenge";
                        p { button id="qr-dismiss" { "Close" } }
                    }
                }

                script { (PreEscaped(JAVASCRIPT)) }
            }
        }
    }
}

/// Browser side of the viewer: push socket, tabs, transcript rendering and
/// the two REST calls.
pub const JAVASCRIPT: &str = r##"
(function () {
    const viewer = { tabs: [], active: null, contacts: [] };

    const transcript = document.getElementById('transcript');
    const tabStrip = document.getElementById('tabs');
    const contactList = document.getElementById('contact-list');
    const input = document.getElementById('terminal-input');
    const qrModal = document.getElementById('qr-modal');
    const qrImage = document.getElementById('qr-image');
    const statusConnection = document.getElementById('status-connection');
    const statusChat = document.getElementById('status-chat');

    function contactName(chatId) {
        const chat = viewer.contacts.find(function (c) { return c.id === chatId; });
        return chat ? chat.name : chatId;
    }

    function renderContacts() {
        contactList.innerHTML = '';
        if (viewer.contacts.length === 0) {
            const empty = document.createElement('li');
            empty.className = 'contact-empty';
            empty.textContent = 'Waiting for login...';
            contactList.appendChild(empty);
            return;
        }
        for (const chat of viewer.contacts) {
            const li = document.createElement('li');
            li.className = 'contact' + (chat.id === viewer.active ? ' active' : '');
            li.dataset.chatId = chat.id;
            li.title = chat.id;

            const icon = document.createElement('span');
            icon.className = 'contact-icon';
            icon.textContent = chat.isGroup ? '{}' : 'JS';
            li.appendChild(icon);

            const name = document.createElement('span');
            name.className = 'contact-name';
            name.textContent = chat.name;
            li.appendChild(name);

            if (chat.unreadCount > 0) {
                const unread = document.createElement('span');
                unread.className = 'contact-unread';
                unread.textContent = chat.unreadCount;
                li.appendChild(unread);
            }
            contactList.appendChild(li);
        }
    }

    function renderTabs() {
        tabStrip.innerHTML = '';
        for (const chatId of viewer.tabs) {
            const tab = document.createElement('div');
            tab.className = 'tab' + (chatId === viewer.active ? ' active' : '');
            tab.dataset.chatId = chatId;

            const label = document.createElement('span');
            label.textContent = contactName(chatId) + '.json';
            tab.appendChild(label);

            const close = document.createElement('span');
            close.className = 'tab-close';
            close.dataset.close = chatId;
            close.textContent = '×';
            tab.appendChild(close);

            tabStrip.appendChild(tab);
        }
        statusChat.textContent = viewer.active ? contactName(viewer.active) : 'No chat open';
    }

    function renderTranscript(messages) {
        let out = '';
        for (const m of messages) {
            if (m.type && m.type !== 'chat') continue;
            const indent = m.fromMe ? '\t\t\t' : '';
            const time = new Date(m.timestamp * 1000).toLocaleString('en-US');
            out += indent + '{\n'
                + indent + '\t"message": "' + m.body + '"\n'
                + indent + '\t"time": "' + time + '"\n'
                + indent + '}\n\n';
        }
        transcript.value = out;
        transcript.scrollTop = transcript.scrollHeight;
    }

    async function fetchMessages(chatId) {
        try {
            const resp = await fetch('/api/messages/' + encodeURIComponent(chatId));
            if (!resp.ok) throw new Error('HTTP ' + resp.status);
            renderTranscript(await resp.json());
        } catch (e) {
            console.error('Error fetching messages:', e);
        }
    }

    function openConversation(chatId) {
        viewer.active = chatId;
        if (!viewer.tabs.includes(chatId)) viewer.tabs.push(chatId);
        renderTabs();
        renderContacts();
        fetchMessages(chatId);
    }

    function closeTab(chatId) {
        viewer.tabs = viewer.tabs.filter(function (t) { return t !== chatId; });
        if (viewer.active === chatId) {
            if (viewer.tabs.length > 0) {
                openConversation(viewer.tabs[viewer.tabs.length - 1]);
                return;
            }
            viewer.active = null;
            transcript.value = '';
            transcript.scrollTop = 0;
        }
        renderTabs();
        renderContacts();
    }

    async function sendMessage(text) {
        if (!viewer.active) {
            console.warn('No contact selected.');
            return;
        }
        const chatId = viewer.active;
        try {
            await fetch('/api/messages/send-message', {
                method: 'POST',
                headers: { 'Content-Type': 'application/json' },
                body: JSON.stringify({ chatId: chatId, message: text }),
            });
        } catch (e) {
            console.error('Error sending message:', e);
        }
        fetchMessages(chatId);
    }

    function handlePush(frame) {
        switch (frame.event) {
            case 'qr':
                qrImage.src = frame.data;
                qrModal.classList.add('visible');
                break;
            case 'ready':
                viewer.contacts = frame.data;
                qrModal.classList.remove('visible');
                renderContacts();
                renderTabs();
                break;
            case 'message_create':
                viewer.contacts = frame.data;
                renderContacts();
                if (viewer.active) fetchMessages(viewer.active);
                break;
        }
    }

    function connect() {
        const proto = location.protocol === 'https:' ? 'wss:' : 'ws:';
        const socket = new WebSocket(proto + '//' + location.host + '/socket');
        socket.onopen = function () { statusConnection.textContent = 'connected'; };
        socket.onclose = function () { statusConnection.textContent = 'disconnected'; };
        socket.onmessage = function (ev) {
            try {
                handlePush(JSON.parse(ev.data));
            } catch (e) {
                console.error('Bad push frame:', e);
            }
        };
    }

    contactList.addEventListener('click', function (ev) {
        const item = ev.target.closest('.contact');
        if (item) openConversation(item.dataset.chatId);
    });

    tabStrip.addEventListener('click', function (ev) {
        if (ev.target.dataset.close) {
            closeTab(ev.target.dataset.close);
            return;
        }
        const tab = ev.target.closest('.tab');
        if (tab) openConversation(tab.dataset.chatId);
    });

    input.addEventListener('keydown', function (ev) {
        if (ev.key !== 'Enter') return;
        const text = input.value;
        input.value = '';
        sendMessage(text);
    });

    document.getElementById('qr-dismiss').addEventListener('click', function () {
        qrModal.classList.remove('visible');
    });

    connect();
})();
"##;
