//! End-to-end tests against an in-process fake host.
//!
//! The fake host speaks the line protocol over a Unix socket pair, the same
//! transport .NET uses for named pipes on Unix.

#![cfg(unix)]

use dotbridge::{Arg, BridgeError, BridgeSession, Channel, Member, SessionState, Value};
use serde_json::{json, Value as Json};
use std::cell::RefCell;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::rc::Rc;
use std::thread::{self, JoinHandle};

fn send(writer: &mut UnixStream, message: Json) {
    writeln!(writer, "{}", message).unwrap();
    writer.flush().unwrap();
}

/// Minimal host: a `System.Math`, a `Runner` that calls back into the client
/// and a `Delay` task. Returns every request it received once the client
/// hangs up.
fn spawn_fake_host(stream: UnixStream) -> JoinHandle<Vec<Json>> {
    thread::spawn(move || {
        let mut writer = stream.try_clone().unwrap();
        let mut reader = BufReader::new(stream);
        let mut received = Vec::new();

        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).unwrap_or(0) == 0 {
                break;
            }
            let request: Json = serde_json::from_str(line.trim_end()).unwrap();
            received.push(request.clone());

            let response = match request["action"].as_str().unwrap_or_default() {
                "GetType" => match request["typeName"].as_str().unwrap_or_default() {
                    "System.Math" => json!({"type": "ref", "id": "math"}),
                    "Runner" => json!({"type": "ref", "id": "runner", "props": {"Name": "runner"}}),
                    "Delay" => json!({"type": "task", "id": "t1"}),
                    name => json!({"type": "error", "message": format!("Type not found: {}", name)}),
                },
                "Inspect" => json!({"type": "null", "memberType": "method"}),
                "Invoke" if request["methodName"] == "Max" => {
                    let max = request["args"]
                        .as_array()
                        .unwrap()
                        .iter()
                        .filter_map(Json::as_i64)
                        .max();
                    json!({"type": "primitive", "value": max})
                }
                "Invoke" if request["methodName"] == "Run" => {
                    let callback_id = request["args"][0]["callbackId"].clone();
                    send(
                        &mut writer,
                        json!({
                            "type": "event",
                            "callbackId": callback_id,
                            "args": [{"type": "primitive", "value": 21}],
                        }),
                    );

                    let mut reply = String::new();
                    reader.read_line(&mut reply).unwrap();
                    let reply: Json = serde_json::from_str(reply.trim_end()).unwrap();
                    received.push(reply.clone());
                    json!({"type": "primitive", "value": reply["result"]})
                }
                "AwaitTask" => json!({"type": "primitive", "value": "slept"}),
                "Release" => json!({"type": "null"}),
                "GetFrameworkInfo" => json!({
                    "type": "primitive",
                    "frameworkMoniker": "net8.0",
                    "runtimeVersion": "8.0.1",
                }),
                other => json!({"type": "error", "message": format!("Unknown action: {}", other)}),
            };
            send(&mut writer, response);
        }
        received
    })
}

fn connect() -> (BridgeSession, JoinHandle<Vec<Json>>) {
    let (client, server) = UnixStream::pair().unwrap();
    let host = spawn_fake_host(server);
    let writer = client.try_clone().unwrap();
    (BridgeSession::from_channel(Channel::new(client, writer)), host)
}

fn actions(received: &[Json]) -> Vec<&str> {
    received
        .iter()
        .filter_map(|r| r["action"].as_str())
        .collect()
}

#[test]
fn test_static_method_call() {
    let (session, host) = connect();

    let math = session.get_type("System.Math").unwrap().into_object().unwrap();
    let max = math.invoke("Max", vec![Arg::from(3), Arg::from(9)]).unwrap();
    assert_eq!(max.as_i64(), Some(9));

    drop(math);
    session.close();
    let received = host.join().unwrap();

    assert_eq!(
        actions(&received),
        vec!["GetType", "Inspect", "Invoke", "Release"]
    );
}

#[test]
fn test_callback_round_trip() {
    let (session, host) = connect();

    let runner = session.get_type("Runner").unwrap().into_object().unwrap();
    assert_eq!(runner.get("Name").unwrap().as_str(), Some("runner"));

    let calls = Rc::new(RefCell::new(Vec::new()));
    let log = calls.clone();
    let doubled = runner
        .invoke(
            "Run",
            vec![Arg::callback(move |args| {
                let n = args.first().and_then(Value::as_i64).unwrap_or_default();
                log.borrow_mut().push(n);
                Ok(Arg::from(n * 2))
            })],
        )
        .unwrap();

    assert_eq!(doubled.as_i64(), Some(42));
    assert_eq!(*calls.borrow(), vec![21]);

    drop(runner);
    session.close();
    let received = host.join().unwrap();
    assert!(received.contains(&json!({"type": "reply", "result": 42})));
}

#[test]
fn test_member_lookup_reports_method() {
    let (session, host) = connect();

    let math = session.get_type("System.Math").unwrap().into_object().unwrap();
    match math.get_member("Abs").unwrap() {
        Member::Method(method) => assert_eq!(method.name(), "Abs"),
        other => panic!("expected a method, got {:?}", other),
    }

    drop(math);
    session.close();
    host.join().unwrap();
}

#[test]
fn test_unknown_type_is_host_error() {
    let (session, host) = connect();

    let err = session.get_type("Does.Not.Exist").unwrap_err();
    assert!(matches!(err, BridgeError::Host { .. }));
    assert_eq!(err.to_string(), "Host Error: Type not found: Does.Not.Exist");

    assert_eq!(session.framework_moniker().unwrap(), "net8.0");
    assert!(session.is_alive());

    session.close();
    assert_eq!(session.state(), SessionState::Closed);
    host.join().unwrap();
}

#[test]
fn test_host_hang_up_is_fatal() {
    let (client, server) = UnixStream::pair().unwrap();
    drop(server);
    let writer = client.try_clone().unwrap();
    let session = BridgeSession::from_channel(Channel::new(client, writer));

    let err = session.get_type("System.Math").unwrap_err();
    assert!(err.is_fatal());
    assert!(matches!(
        session.get_type("System.Math").unwrap_err(),
        BridgeError::ChannelDead
    ));
}

#[tokio::test(flavor = "current_thread")]
async fn test_task_result_can_be_awaited() {
    let (session, host) = connect();

    let task = session.get_type("Delay").unwrap().into_task().unwrap();
    let value = task.await.unwrap();
    assert_eq!(value.as_str(), Some("slept"));

    session.close();
    let received = host.join().unwrap();
    assert_eq!(
        actions(&received),
        vec!["GetType", "AwaitTask", "Release"]
    );
    assert_eq!(received[2]["targetId"], "t1");
}
