//! Contact form email bodies (Spanish, as shown on the landing page).

use chrono::Utc;

use super::OutboundEmail;
use crate::api::validation::ContactMessage;

/// Characters of the original message echoed back to the submitter.
const EXCERPT_LENGTH: usize = 200;
const NO_PHONE: &str = "No proporcionado";

pub(super) fn admin_notification(message: &ContactMessage, admin_email: &str) -> OutboundEmail {
    let phone = message.phone.as_deref().unwrap_or(NO_PHONE);
    let received = Utc::now().format("%d/%m/%Y %H:%M:%S UTC").to_string();

    let text = format!(
        "Nuevo mensaje de contacto\n\n\
         Nombre completo: {}\nEmail: {}\nTeléfono: {}\n\nMensaje:\n{}\n\nFecha: {}\n",
        message.full_name, message.email, phone, message.message, received
    );

    let html = format!(
        r#"<html>
<body>
  <h1>Nuevo Mensaje de Contacto</h1>
  <p>Has recibido un nuevo mensaje de contacto desde la landing page:</p>
  <div style="background-color: #f5f5f5; padding: 20px; border-radius: 5px; margin: 20px 0;">
    <h2>Información del Contacto:</h2>
    <p><strong>Nombre completo:</strong> {name}</p>
    <p><strong>Email:</strong> {email}</p>
    <p><strong>Teléfono:</strong> {phone}</p>
    <p><strong>Mensaje:</strong></p>
    <div style="background-color: white; padding: 15px; border-left: 4px solid #007bff; margin: 10px 0;">
      {body}
    </div>
  </div>
  <p><strong>Fecha:</strong> {received}</p>
  <hr>
  <p><em>Este mensaje fue enviado automáticamente desde el formulario de contacto de Urbex.</em></p>
</body>
</html>"#,
        name = escape_html(&message.full_name),
        email = escape_html(&message.email),
        phone = escape_html(phone),
        body = escape_html(&message.message).replace('\n', "<br>"),
        received = received,
    );

    OutboundEmail {
        to: admin_email.to_string(),
        subject: format!("Nuevo mensaje de contacto de {}", message.full_name),
        text,
        html,
        reply_to: Some(message.email.clone()),
    }
}

pub(super) fn submitter_confirmation(message: &ContactMessage) -> OutboundEmail {
    let phone = message.phone.as_deref().unwrap_or(NO_PHONE);
    let summary = excerpt(&message.message);

    let text = format!(
        "Hola {},\n\n\
         Hemos recibido tu mensaje y nos pondremos en contacto contigo pronto.\n\n\
         Email: {}\nTeléfono: {}\nMensaje: {}\n\n\
         Te responderemos en las próximas 24 horas.\n\nSaludos,\nEl equipo de Urbex\n",
        message.full_name, message.email, phone, summary
    );

    let html = format!(
        r#"<html>
<body>
  <h1>¡Gracias por contactarnos!</h1>
  <p>Hola {name},</p>
  <p>Hemos recibido tu mensaje y nos pondremos en contacto contigo pronto.</p>
  <div style="background-color: #f5f5f5; padding: 15px; border-radius: 5px; margin: 20px 0;">
    <h3>Resumen de tu mensaje:</h3>
    <p><strong>Email:</strong> {email}</p>
    <p><strong>Teléfono:</strong> {phone}</p>
    <p><strong>Mensaje:</strong></p>
    <div style="background-color: white; padding: 10px; border-left: 3px solid #28a745;">
      {summary}
    </div>
  </div>
  <p>Te responderemos en las próximas 24 horas.</p>
  <p>Saludos,<br>El equipo de Urbex</p>
</body>
</html>"#,
        name = escape_html(&message.full_name),
        email = escape_html(&message.email),
        phone = escape_html(phone),
        summary = escape_html(&summary),
    );

    OutboundEmail {
        to: message.email.clone(),
        subject: "Gracias por contactarnos - Urbex".to_string(),
        text,
        html,
        reply_to: None,
    }
}

/// First [`EXCERPT_LENGTH`] characters, with an ellipsis when cut.
fn excerpt(message: &str) -> String {
    let mut chars = message.chars();
    let head: String = chars.by_ref().take(EXCERPT_LENGTH).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            other => escaped.push(other),
        }
    }
    escaped
}
