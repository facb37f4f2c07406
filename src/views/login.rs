use dioxus::prelude::*;
use tracing::{info, warn};

use crate::backend::auth::{FieldError, LoginField, LoginForm, SUPERUSERS};
use crate::backend::PocketBase;
use crate::error::AuthFailure;
use crate::Route;

fn message_for(errors: &[FieldError], field: LoginField) -> Option<&'static str> {
    errors.iter().find(|e| e.field == field).map(|e| e.message)
}

#[component]
pub fn AdminLogin() -> Element {
    let pb = use_context::<PocketBase>();
    let nav = navigator();
    let mut email = use_signal(String::new);
    let mut password = use_signal(String::new);
    let mut field_errors = use_signal(Vec::<FieldError>::new);
    let mut failure = use_signal(|| None::<AuthFailure>);
    let mut submitting = use_signal(|| false);

    let signed_in = pb.auth_state().is_superuser();
    use_effect(move || {
        if signed_in {
            nav.replace(Route::Admin {});
        }
    });

    let submit = move |e: FormEvent| {
        e.prevent_default();
        if submitting() {
            return;
        }
        let form = LoginForm {
            email: email(),
            password: password(),
        };
        let errors = form.validate();
        if !errors.is_empty() {
            field_errors.set(errors);
            return;
        }
        field_errors.set(Vec::new());
        failure.set(None);
        submitting.set(true);

        let pb = pb.clone();
        spawn(async move {
            let result = pb
                .collection(SUPERUSERS)
                .auth_with_password(form.email.trim(), &form.password)
                .await;
            submitting.set(false);
            match result {
                Ok(record) => {
                    info!(email = %record.email, "signed in");
                    nav.push(Route::Admin {});
                }
                Err(e) => {
                    warn!("sign-in failed: {e}");
                    failure.set(Some(AuthFailure::from(&e)));
                }
            }
        });
    };

    let email_error = message_for(&field_errors.read(), LoginField::Email);
    let password_error = message_for(&field_errors.read(), LoginField::Password);
    let button_label = if submitting() { "Signing in…" } else { "Sign in" };

    rsx! {
        div {
            class: "login",
            style: "min-height: 100vh; display: flex; align-items: center; justify-content: center; font-family: system-ui;",
            form {
                style: "width: 320px; display: flex; flex-direction: column; gap: 8px;",
                onsubmit: submit,
                h1 { style: "font-size: 22px; text-align: center;", "Admin sign in" }

                if let Some(failure) = failure() {
                    div { style: "color: #b91c1c; background: #fee2e2; padding: 8px; border-radius: 4px;", "{failure}" }
                }

                label { "Email" }
                input {
                    r#type: "email",
                    value: "{email}",
                    oninput: move |e| email.set(e.value()),
                }
                if let Some(message) = email_error {
                    span { style: "color: #b91c1c; font-size: 12px;", "{message}" }
                }

                label { "Password" }
                input {
                    r#type: "password",
                    value: "{password}",
                    oninput: move |e| password.set(e.value()),
                }
                if let Some(message) = password_error {
                    span { style: "color: #b91c1c; font-size: 12px;", "{message}" }
                }

                button { r#type: "submit", disabled: submitting(), "{button_label}" }
            }
        }
    }
}
